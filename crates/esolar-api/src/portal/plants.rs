// Plant-level monitor endpoints
//
// Plant list, plant detail, the daily chart, and the H1 storage power
// snapshot. Every call returns the raw JSON document; interpretation
// happens in the core crate.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::portal::client::{Params, PortalClient};
use crate::portal::endpoint::Endpoint;
use crate::portal::window::ChartWindow;

/// Filter form of the plant list page, submitted empty except for the
/// client date and the search mode.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlantListForm<'a> {
    page_no: &'static str,
    page_size: &'static str,
    order_by_index: &'static str,
    office_id: &'static str,
    client_date: &'a str,
    running_state: &'static str,
    select_input_type: u8,
    plant_name: &'static str,
    device_sn: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    country_code: &'static str,
    is_rename: &'static str,
    is_time_error: &'static str,
    system_power_least: &'static str,
    system_power_most: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlantDateForm<'a> {
    plantuid: &'a str,
    client_date: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlantChartQuery<'a> {
    plantuid: &'a str,
    chart_date_type: u8,
    energy_type: u8,
    device_sn_arr: &'a str,
    chart_count_type: u8,
    #[serde(flatten)]
    window: &'a ChartWindow,
    elec_devicesn: &'a str,
    #[serde(rename = "_")]
    cache_buster: i64,
}

#[derive(Serialize)]
struct StorePowerQuery<'a> {
    plantuid: &'static str,
    devicesn: &'a str,
    #[serde(rename = "_")]
    cache_buster: i64,
}

impl PortalClient {
    /// List every plant visible to the account.
    ///
    /// `POST monitor/site/getUserPlantList` (form)
    pub async fn get_user_plant_list(&self, window: &ChartWindow) -> Result<Value, Error> {
        debug!("listing plants");
        let form = PlantListForm {
            page_no: "",
            page_size: "",
            order_by_index: "",
            office_id: "",
            client_date: &window.client_date,
            running_state: "",
            select_input_type: 1,
            plant_name: "",
            device_sn: "",
            kind: "",
            country_code: "",
            is_rename: "",
            is_time_error: "",
            system_power_least: "",
            system_power_most: "",
        };
        self.call(Method::POST, Endpoint::UserPlantList, Params::Form, &form)
            .await
    }

    /// Detail of one plant for the window's client date.
    ///
    /// `POST monitor/site/getPlantDetailInfo` (form)
    pub async fn get_plant_detail_info(
        &self,
        plantuid: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(plantuid, "fetching plant detail");
        let form = PlantDateForm {
            plantuid,
            client_date: &window.client_date,
        };
        self.call(Method::POST, Endpoint::PlantDetailInfo, Params::Form, &form)
            .await
    }

    /// Daily production chart of a plant.
    ///
    /// `elec_devicesn` is the storage inverter serial on H1 installations
    /// and empty otherwise.
    ///
    /// `POST monitor/site/getPlantDetailChart2` (query string)
    pub async fn get_plant_detail_chart(
        &self,
        plantuid: &str,
        device_sn: &str,
        elec_devicesn: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(plantuid, device_sn, "fetching plant chart");
        let query = PlantChartQuery {
            plantuid,
            chart_date_type: 1,
            energy_type: 0,
            device_sn_arr: device_sn,
            chart_count_type: 2,
            window,
            elec_devicesn,
            cache_buster: window.epoch_millis,
        };
        self.call(Method::POST, Endpoint::PlantDetailChart, Params::Query, &query)
            .await
    }

    /// Live power flow of an H1 storage inverter.
    ///
    /// The portal keys this call on the device serial alone; `plantuid` is
    /// sent empty.
    ///
    /// `POST monitor/site/getStoreOrAcDevicePowerInfo` (query string)
    pub async fn get_store_device_power(
        &self,
        devicesn: &str,
        window: &ChartWindow,
    ) -> Result<Value, Error> {
        debug!(devicesn, "fetching storage power");
        let query = StorePowerQuery {
            plantuid: "",
            devicesn,
            cache_buster: window.epoch_millis,
        };
        self.call(Method::POST, Endpoint::StoreDevicePower, Params::Query, &query)
            .await
    }
}
