//! Built-in contracts and functions
//!
//! These are pre-registered by [`Emulator::with_builtins`](crate::Emulator::with_builtins)
//! so a fresh emulator can read and write the ledger without any user code.

use serde_json::{json, Value};

use crate::contract::{Contract, ContractContext};
use crate::database::{DatabaseKey, MutableDatabase};
use crate::function::Function;
use crate::ledger::{AssetFilter, Ledger, VersionOrder};
use crate::{Error, Result};

pub const GET_CONTRACT: &str = "emulator.contract.Get";
pub const PUT_CONTRACT: &str = "emulator.contract.Put";
pub const SCAN_CONTRACT: &str = "emulator.contract.Scan";
pub const STATE_UPDATER_FUNCTION: &str = "emulator.function.StateUpdater";

/// Ids the built-in contracts are registered under, with their binary names
pub const BUILTIN_CONTRACTS: [(&str, &str); 3] = [
    ("get", GET_CONTRACT),
    ("put", PUT_CONTRACT),
    ("scan", SCAN_CONTRACT),
];

/// Namespace and table `StateUpdater` writes to
pub const STATE_NAMESPACE: &str = "emulator";
pub const STATE_TABLE: &str = "state";

fn required_str<'a>(argument: &'a Value, name: &str) -> Result<&'a str> {
    argument
        .get(name)
        .ok_or_else(|| Error::ContractContext(format!("{} attribute is missing", name)))?
        .as_str()
        .ok_or_else(|| Error::ContractContext(format!("{} must be a string", name)))
}

fn optional_non_negative(argument: &Value, name: &str) -> Result<Option<u32>> {
    let Some(value) = argument.get(name) else {
        return Ok(None);
    };
    let n = value
        .as_i64()
        .ok_or_else(|| Error::ContractContext(format!("{} must be an integer", name)))?;
    if n < 0 {
        return Err(Error::ContractContext("value must be non-negative".into()));
    }
    u32::try_from(n)
        .map(Some)
        .map_err(|_| Error::ContractContext(format!("{} is out of range", name)))
}

// ── Contracts ─────────────────────────────────────────────

/// Returns the latest version of `asset_id`
pub struct GetContract;

impl Contract for GetContract {
    fn invoke(
        &self,
        _ctx: &ContractContext<'_>,
        ledger: &mut dyn Ledger,
        argument: &Value,
        _properties: Option<&Value>,
    ) -> Result<Option<Value>> {
        let asset_id = required_str(argument, "asset_id")?;
        match ledger.get(asset_id) {
            Some(asset) => Ok(Some(asset.to_json())),
            None => Ok(Some(json!({
                "result": "failure",
                "message": format!("{} is not in the ledger", asset_id),
            }))),
        }
    }
}

/// Appends `data` as a new version of `asset_id`
pub struct PutContract;

impl Contract for PutContract {
    fn invoke(
        &self,
        _ctx: &ContractContext<'_>,
        ledger: &mut dyn Ledger,
        argument: &Value,
        _properties: Option<&Value>,
    ) -> Result<Option<Value>> {
        let (Some(asset_id), Some(data)) = (argument.get("asset_id"), argument.get("data")) else {
            return Err(Error::ContractContext(
                "a required attribute is missing".into(),
            ));
        };
        let asset_id = asset_id
            .as_str()
            .ok_or_else(|| Error::ContractContext("asset_id must be a string".into()))?;

        // Read before write so the asset is part of the read set.
        ledger.get(asset_id);
        ledger.put(asset_id, data.clone());
        Ok(None)
    }
}

/// Lists versions of `asset_id`, newest first unless `asc_order` is set
pub struct ScanContract;

impl Contract for ScanContract {
    fn invoke(
        &self,
        _ctx: &ContractContext<'_>,
        ledger: &mut dyn Ledger,
        argument: &Value,
        _properties: Option<&Value>,
    ) -> Result<Option<Value>> {
        let mut filter = AssetFilter::new(required_str(argument, "asset_id")?);

        if let Some(start) = optional_non_negative(argument, "start")? {
            filter = filter.with_start_version(start);
        }
        if let Some(end) = optional_non_negative(argument, "end")? {
            filter = filter.with_end_version(end);
        }
        if let Some(limit) = optional_non_negative(argument, "limit")? {
            filter = filter.with_limit(limit);
        }
        if let Some(asc) = argument.get("asc_order") {
            let asc = asc
                .as_bool()
                .ok_or_else(|| Error::ContractContext("asc_order must be a boolean".into()))?;
            filter = filter.with_order(if asc {
                VersionOrder::Ascending
            } else {
                VersionOrder::Descending
            });
        }

        let data: Vec<Value> = ledger.scan(&filter).iter().map(|a| a.to_json()).collect();
        Ok(Some(json!({ "data": data })))
    }
}

// ── Functions ─────────────────────────────────────────────

/// Records `{ "state": n }` for `asset_id` in the side-database
pub struct StateUpdater;

impl Function for StateUpdater {
    fn invoke(
        &self,
        database: &mut dyn MutableDatabase,
        _contract_argument: &Value,
        function_argument: Option<&Value>,
        _contract_properties: Option<&Value>,
    ) -> Result<()> {
        let Some(argument) = function_argument else {
            return Ok(());
        };
        let asset_id = required_str(argument, "asset_id")?;
        let state = argument
            .get("state")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::ContractContext("state must be an integer".into()))?;
        if asset_id.is_empty() {
            return Ok(());
        }

        database.put(
            DatabaseKey::new(STATE_NAMESPACE, STATE_TABLE, asset_id),
            json!({ "state": state }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractInstance;
    use crate::database::MemoryDatabase;
    use crate::ledger::AssetLedger;

    const ASSET_ID: &str = "X";

    fn instance(logic: impl Contract + 'static) -> ContractInstance {
        ContractInstance::new("builtin", "test", Box::new(logic))
    }

    /// Ledger holding versions 0, 1 and 2 of `X`
    fn ledger_with_age_two_asset() -> AssetLedger {
        let put = instance(PutContract);
        let mut ledger = AssetLedger::new();
        for _ in 0..3 {
            put.invoke(&mut ledger, &json!({"asset_id": ASSET_ID, "data": {}}), None)
                .unwrap();
        }
        ledger
    }

    fn scan(ledger: &mut AssetLedger, argument: Value) -> Result<Vec<Value>> {
        let result = instance(ScanContract).invoke(ledger, &argument, None)?;
        Ok(result.unwrap()["data"].as_array().unwrap().clone())
    }

    fn ages(data: &[Value]) -> Vec<i64> {
        data.iter().map(|a| a["age"].as_i64().unwrap()).collect()
    }

    // ── Put ───────────────────────────────────────────────

    #[test]
    fn test_put_returns_none() {
        let mut ledger = AssetLedger::new();
        let result = instance(PutContract)
            .invoke(&mut ledger, &json!({"asset_id": ASSET_ID, "data": {}}), None)
            .unwrap();
        assert_eq!(result, None);
        assert!(ledger.get(ASSET_ID).is_some());
    }

    #[test]
    fn test_put_missing_attribute() {
        let mut ledger = AssetLedger::new();
        let err = instance(PutContract)
            .invoke(&mut ledger, &json!({"asset_id": ASSET_ID}), None)
            .unwrap_err();
        assert!(matches!(err, Error::ContractContext(_)));
    }

    // ── Get ───────────────────────────────────────────────

    #[test]
    fn test_get_existing_asset() {
        let mut ledger = ledger_with_age_two_asset();
        let result = instance(GetContract)
            .invoke(&mut ledger, &json!({"asset_id": ASSET_ID}), None)
            .unwrap()
            .unwrap();
        assert_eq!(result["asset_id"], ASSET_ID);
        assert_eq!(result["age"], 2);
    }

    #[test]
    fn test_get_asset_not_in_ledger() {
        let mut ledger = AssetLedger::new();
        let result = instance(GetContract)
            .invoke(&mut ledger, &json!({"asset_id": ASSET_ID}), None)
            .unwrap()
            .unwrap();
        assert_eq!(result["result"], "failure");
        assert!(result["message"]
            .as_str()
            .unwrap()
            .ends_with("is not in the ledger"));
    }

    #[test]
    fn test_get_missing_asset_id() {
        let mut ledger = AssetLedger::new();
        let err = instance(GetContract)
            .invoke(&mut ledger, &json!({}), None)
            .unwrap_err();
        assert!(matches!(err, Error::ContractContext(_)));
    }

    // ── Scan ──────────────────────────────────────────────

    #[test]
    fn test_scan_all_versions_newest_first() {
        let mut ledger = ledger_with_age_two_asset();
        let data = scan(&mut ledger, json!({"asset_id": ASSET_ID})).unwrap();
        assert_eq!(ages(&data), vec![2, 1, 0]);
        assert_eq!(data[0]["asset_id"], ASSET_ID);
    }

    #[test]
    fn test_scan_unknown_asset() {
        let mut ledger = ledger_with_age_two_asset();
        assert!(scan(&mut ledger, json!({"asset_id": "Y"})).unwrap().is_empty());
    }

    #[test]
    fn test_scan_start_version() {
        let mut ledger = ledger_with_age_two_asset();
        let data = scan(&mut ledger, json!({"asset_id": ASSET_ID, "start": 1})).unwrap();
        assert_eq!(ages(&data), vec![2, 1]);

        let data = scan(&mut ledger, json!({"asset_id": ASSET_ID, "start": 5})).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_scan_end_version() {
        let mut ledger = ledger_with_age_two_asset();
        let data = scan(&mut ledger, json!({"asset_id": ASSET_ID, "end": 2})).unwrap();
        assert_eq!(ages(&data), vec![1, 0]);
    }

    #[test]
    fn test_scan_start_and_end() {
        let mut ledger = ledger_with_age_two_asset();
        let data = scan(
            &mut ledger,
            json!({"asset_id": ASSET_ID, "start": 1, "end": 2}),
        )
        .unwrap();
        assert_eq!(ages(&data), vec![1]);
    }

    #[test]
    fn test_scan_limit_and_order() {
        let mut ledger = ledger_with_age_two_asset();
        let data = scan(&mut ledger, json!({"asset_id": ASSET_ID, "limit": 1})).unwrap();
        assert_eq!(ages(&data), vec![2]);

        let data = scan(
            &mut ledger,
            json!({"asset_id": ASSET_ID, "asc_order": true}),
        )
        .unwrap();
        assert_eq!(ages(&data), vec![0, 1, 2]);

        let data = scan(
            &mut ledger,
            json!({"asset_id": ASSET_ID, "start": 1, "limit": 1, "asc_order": true}),
        )
        .unwrap();
        assert_eq!(ages(&data), vec![1]);
    }

    #[test]
    fn test_scan_rejects_negative_and_malformed_bounds() {
        let mut ledger = ledger_with_age_two_asset();
        for field in ["start", "end", "limit"] {
            let mut negative = json!({"asset_id": ASSET_ID});
            negative[field] = json!(-2);
            assert!(matches!(
                scan(&mut ledger, negative),
                Err(Error::ContractContext(_))
            ));

            let mut malformed = json!({"asset_id": ASSET_ID});
            malformed[field] = json!("&&");
            assert!(matches!(
                scan(&mut ledger, malformed),
                Err(Error::ContractContext(_))
            ));
        }
    }

    #[test]
    fn test_scan_missing_asset_id() {
        let mut ledger = AssetLedger::new();
        assert!(matches!(
            scan(&mut ledger, json!({})),
            Err(Error::ContractContext(_))
        ));
    }

    // ── StateUpdater ──────────────────────────────────────

    #[test]
    fn test_state_updater_writes_state() {
        let mut db = MemoryDatabase::new();
        StateUpdater
            .invoke(&mut db, &json!({}), Some(&json!({"asset_id": "A", "state": 3})), None)
            .unwrap();
        assert_eq!(
            db.get(&DatabaseKey::new(STATE_NAMESPACE, STATE_TABLE, "A")),
            Some(json!({"state": 3}))
        );
    }

    #[test]
    fn test_state_updater_ignores_empty_id_and_missing_argument() {
        let mut db = MemoryDatabase::new();
        StateUpdater
            .invoke(&mut db, &json!({}), Some(&json!({"asset_id": "", "state": 3})), None)
            .unwrap();
        StateUpdater.invoke(&mut db, &json!({}), None, None).unwrap();
        assert!(db.is_empty());
    }
}
