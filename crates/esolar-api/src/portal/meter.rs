// SEC meter module endpoints
//
// Plants fitted with an SEC energy meter expose grid/load metering through
// a separate family of calls keyed by the module serial.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::portal::client::{Params, PortalClient};
use crate::portal::endpoint::Endpoint;
use crate::portal::window::ChartWindow;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleListForm<'a> {
    page_no: &'static str,
    page_size: &'static str,
    plant_uid: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeterDetailForm<'a> {
    plantuid: &'a str,
    client_date: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnergyPreviewQuery<'a> {
    plantuid: &'a str,
    module_sn: &'a str,
    #[serde(rename = "_")]
    cache_buster: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeterChartQuery<'a> {
    plantuid: &'a str,
    chart_date_type: u8,
    energy_type: u8,
    device_sn_arr: &'static str,
    chart_count_type: u8,
    #[serde(flatten)]
    window: &'a ChartWindow,
    module_sn: &'a str,
    #[serde(rename = "_")]
    cache_buster: i64,
}

impl PortalClient {
    /// Meter modules attached to a plant.
    ///
    /// `POST cloudmonitor/plantMeterModule/getPlantMeterModuleList` (form)
    pub async fn get_plant_meter_module_list(&self, plantuid: &str) -> Result<Value, Error> {
        debug!(plantuid, "listing meter modules");
        let form = ModuleListForm {
            page_no: "",
            page_size: "",
            plant_uid: plantuid,
        };
        self.call(Method::POST, Endpoint::MeterModuleList, Params::Form, &form)
            .await
    }

    /// Cumulative meter totals for the window's client date.
    ///
    /// `POST monitor/site/getPlantMeterDetailInfo` (form)
    pub async fn get_plant_meter_detail_info(
        &self,
        plantuid: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(plantuid, "fetching meter detail");
        let form = MeterDetailForm {
            plantuid,
            client_date: &window.client_date,
        };
        self.call(Method::POST, Endpoint::MeterDetailInfo, Params::Form, &form)
            .await
    }

    /// Energy preview of one meter module. The only `GET` in the cycle.
    ///
    /// `GET monitor/site/getPlantMeterEnergyPreviewInfo` (query string)
    pub async fn get_plant_meter_energy_preview(
        &self,
        plantuid: &str,
        module_sn: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(plantuid, module_sn, "fetching meter energy preview");
        let query = EnergyPreviewQuery {
            plantuid,
            module_sn,
            cache_buster: window.epoch_millis,
        };
        self.call(Method::GET, Endpoint::MeterEnergyPreview, Params::Query, &query)
            .await
    }

    /// Daily meter chart, including the power series rows used for the
    /// live load/export readings.
    ///
    /// `POST monitor/site/getPlantMeterChartData` (query string)
    pub async fn get_plant_meter_chart_data(
        &self,
        plantuid: &str,
        module_sn: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(plantuid, module_sn, "fetching meter chart");
        let query = MeterChartQuery {
            plantuid,
            chart_date_type: 1,
            energy_type: 0,
            device_sn_arr: "",
            chart_count_type: 2,
            window,
            module_sn,
            cache_buster: window.epoch_millis,
        };
        self.call(Method::POST, Endpoint::MeterChartData, Params::Query, &query)
            .await
    }
}
