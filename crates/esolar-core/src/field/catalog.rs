// Built-in field catalog
//
// Every measurement the portal exposes, grouped by hardware module. Keys are
// the portal's own names so they line up with what users see in the web UI.

use super::coerce::{Coercion, DirectionTable};
use super::path::FieldPath;
use super::schema::{FieldModule, FieldSpec, Unit};

/// Rows of the meter chart's `dataCountList`; the last column is the most
/// recent sample.
const HOME_LOAD_ROW: i64 = 1;
const SOLAR_LOAD_ROW: i64 = 2;
const EXPORT_ROW: i64 = 3;
const GRID_LOAD_ROW: i64 = 4;

/// Fields of one module, in display order.
pub fn fields(module: FieldModule, plant_index: usize) -> Vec<FieldSpec> {
    match module {
        FieldModule::Base => base_fields(plant_index),
        FieldModule::H1 => h1_fields(),
        FieldModule::Sec => sec_fields(),
    }
}

/// Every field of every module. Keys shared between modules appear once per
/// module.
pub fn all_fields(plant_index: usize) -> Vec<FieldSpec> {
    [FieldModule::Base, FieldModule::H1, FieldModule::Sec]
        .into_iter()
        .flat_map(|m| fields(m, plant_index))
        .collect()
}

fn plant_list_entry(plant_index: usize) -> FieldPath {
    FieldPath::root("plantList").index(i64::try_from(plant_index).unwrap_or(i64::MAX))
}

fn base_fields(plant_index: usize) -> Vec<FieldSpec> {
    let detail = |key: &str| FieldPath::root("plantDetail").key(key);
    let plant = |key: &str| plant_list_entry(plant_index).key(key);
    let base = |key: &str, path: FieldPath, coercion: Coercion| {
        FieldSpec::new(key, path, coercion, FieldModule::Base)
    };

    let mut specs = vec![
        base("nowPower", detail("nowPower"), Coercion::Float).with_unit(Unit::Watt),
        base("runningState", detail("runningState"), Coercion::BoolFromCount),
        base("devOnlineNum", detail("devOnlineNum"), Coercion::BoolFromCount),
    ];

    for key in [
        "todayElectricity",
        "monthElectricity",
        "yearElectricity",
        "totalElectricity",
    ] {
        specs.push(base(key, detail(key), Coercion::Float).with_unit(Unit::KilowattHour));
    }

    for key in ["todayGridIncome", "income"] {
        specs.push(base(key, detail(key), Coercion::Float));
    }

    specs.push(base("lastUploadTime", detail("lastUploadTime"), Coercion::Raw));

    for key in ["totalPlantTreeNum", "totalReduceCo2"] {
        specs.push(base(key, detail(key), Coercion::Float));
    }

    specs.push(base("selfUseRate", detail("selfUseRate"), Coercion::Percentage).with_unit(Unit::Percent));

    for key in ["plantuid", "plantname", "currency", "address"] {
        specs.push(base(key, plant(key), Coercion::Text));
    }

    // Exposed as systemPower, reported by the portal as systempower.
    specs.push(base("systemPower", plant("systempower"), Coercion::Raw).with_unit(Unit::Watt));
    specs.push(base("isOnline", plant("isOnline"), Coercion::YesNo));
    specs.push(base("status", FieldPath::root("status"), Coercion::Raw));
    specs.push(base("peakPower", FieldPath::root("peakPower"), Coercion::Float).with_unit(Unit::Watt));

    specs
}

fn h1_fields() -> Vec<FieldSpec> {
    let view = |key: &str| FieldPath::root("viewBean").key(key);
    let store = |key: &str| FieldPath::root("storeDevicePower").key(key);
    let detail = |key: &str| FieldPath::root("plantDetail").key(key);
    let h1 = |key: &str, path: FieldPath, coercion: Coercion| {
        FieldSpec::new(key, path, coercion, FieldModule::H1)
    };

    let mut specs = Vec::new();

    for key in ["totalBuyElec", "totalConsumpElec", "totalSellElec"] {
        specs.push(h1(key, detail(key), Coercion::Float).with_unit(Unit::KilowattHour));
    }

    for key in [
        "chargeElec",
        "dischargeElec",
        "buyElec",
        "sellElec",
        "pvElec",
        "selfConsumedEnergy1",
        "selfConsumedEnergy2",
        "useElec",
    ] {
        specs.push(h1(key, view(key), Coercion::Float).with_unit(Unit::KilowattHour));
    }

    for key in ["buyRate", "sellRate", "selfConsumedRate1", "selfConsumedRate2"] {
        specs.push(h1(key, view(key), Coercion::Percentage).with_unit(Unit::Percent));
    }

    specs.extend([
        h1("batCapcity", store("batCapcity"), Coercion::Float).with_unit(Unit::AmpereHour),
        h1("batCurr", store("batCurr"), Coercion::Float).with_unit(Unit::AmpereHour),
        h1("batEnergyPercent", store("batEnergyPercent"), Coercion::Float).with_unit(Unit::Percent),
    ]);

    for key in ["batteryPower", "gridPower", "pvPower", "solarPower", "outPower"] {
        specs.push(h1(key, store(key), Coercion::Float).with_unit(Unit::Watt));
    }

    specs.extend([
        h1("isStorageAlarm", store("isStorageAlarm"), Coercion::Int),
        h1(
            "batteryDirection",
            store("batteryDirection"),
            Coercion::Direction(DirectionTable::Battery),
        ),
        h1(
            "gridDirection",
            store("gridDirection"),
            Coercion::Direction(DirectionTable::Flow),
        ),
        h1(
            "outPutDirection",
            store("outPutDirection"),
            Coercion::Direction(DirectionTable::Flow),
        ),
        h1(
            "pvDirection",
            store("pvDirection"),
            Coercion::Direction(DirectionTable::Flow),
        ),
        h1("h1Online", store("isOnline"), Coercion::BoolFromCount),
    ]);

    specs
}

fn sec_fields() -> Vec<FieldSpec> {
    let chart = FieldPath::root("getPlantMeterChartData");
    let view = |key: &str| chart.clone().key("viewBean").key(key);
    let series = |row: i64| chart.clone().key("dataCountList").index(row).index(-1);
    let meter = |key: &str| {
        FieldPath::root("getPlantMeterDetailInfo")
            .key("plantDetail")
            .key(key)
    };
    let sec = |key: &str, path: FieldPath, coercion: Coercion| {
        FieldSpec::new(key, path, coercion, FieldModule::Sec)
    };

    let mut specs = Vec::new();

    for key in [
        "pvElec",
        "useElec",
        "buyElec",
        "sellElec",
        "selfConsumedEnergy1",
        "selfConsumedEnergy2",
    ] {
        specs.push(sec(key, view(key), Coercion::Float).with_unit(Unit::KilowattHour));
    }

    for key in ["reduceCo2", "plantTreeNum"] {
        specs.push(sec(key, view(key), Coercion::Float));
    }

    for key in ["buyRate", "sellRate", "selfConsumedRate1", "selfConsumedRate2"] {
        specs.push(sec(key, view(key), Coercion::Percentage).with_unit(Unit::Percent));
    }

    for (key, row) in [
        ("homeLoadPower", HOME_LOAD_ROW),
        ("solarLoadPower", SOLAR_LOAD_ROW),
        ("exportPower", EXPORT_ROW),
        ("gridLoadPower", GRID_LOAD_ROW),
    ] {
        specs.push(sec(key, series(row), Coercion::Float).with_unit(Unit::Watt));
    }

    specs.push(sec("selfUseRate", meter("selfUseRate"), Coercion::Percentage).with_unit(Unit::Percent));

    for key in [
        "totalPvEnergy",
        "totalLoadEnergy",
        "totalBuyEnergy",
        "totalSellEnergy",
    ] {
        specs.push(sec(key, meter(key), Coercion::Float).with_unit(Unit::KilowattHour));
    }

    specs
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::config::ModuleVariant;
    use crate::field::schema::FieldSchema;

    #[test]
    fn keys_are_unique_within_a_module() {
        for module in [FieldModule::Base, FieldModule::H1, FieldModule::Sec] {
            let specs = fields(module, 0);
            let keys: HashSet<_> = specs.iter().map(|s| s.key.as_str()).collect();
            assert_eq!(keys.len(), specs.len(), "duplicate key in {module}");
        }
    }

    #[test]
    fn plant_index_is_part_of_the_path() {
        let specs = fields(FieldModule::Base, 2);
        let uid = specs.iter().find(|s| s.key == "plantuid").map(|s| s.path.to_string());
        assert_eq!(uid.as_deref(), Some("plantList[2].plantuid"));

        let power = specs.iter().find(|s| s.key == "systemPower").map(|s| s.path.to_string());
        assert_eq!(power.as_deref(), Some("plantList[2].systempower"));
    }

    #[test]
    fn sec_overrides_base_self_use_rate() {
        let schema = FieldSchema::for_variant(ModuleVariant::SajSec, 0);
        let spec = schema.get("selfUseRate").map(|s| s.path.to_string());
        assert_eq!(
            spec.as_deref(),
            Some("getPlantMeterDetailInfo.plantDetail.selfUseRate")
        );
    }

    #[test]
    fn meter_series_use_last_column() {
        let specs = fields(FieldModule::Sec, 0);
        let paths: Vec<String> = specs
            .iter()
            .filter(|s| s.key.ends_with("Power"))
            .map(|s| s.path.to_string())
            .collect();
        assert_eq!(
            paths,
            [
                "getPlantMeterChartData.dataCountList[1][-1]",
                "getPlantMeterChartData.dataCountList[2][-1]",
                "getPlantMeterChartData.dataCountList[3][-1]",
                "getPlantMeterChartData.dataCountList[4][-1]",
            ]
        );
    }

    #[test]
    fn variant_schemas_do_not_mix_modules() {
        let h1 = FieldSchema::for_variant(ModuleVariant::H1, 0);
        assert!(h1.get("batteryDirection").is_some());
        assert!(h1.get("homeLoadPower").is_none());

        let base = FieldSchema::for_variant(ModuleVariant::Base, 0);
        assert!(base.get("nowPower").is_some());
        assert!(base.get("pvElec").is_none());
        assert!(base.iter().all(|s| s.module == FieldModule::Base));
    }
}
