// Device listing
//
// `findDevicePageList` is called twice on SEC installations: once plain to
// resolve device serials, and once scoped to the office and month for the
// meter view.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::portal::client::{Params, PortalClient};
use crate::portal::endpoint::Endpoint;

/// Scope of a device list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceScope<'a> {
    /// All devices of the plant, no office or date filter.
    Plant,
    /// Office-scoped listing for a chart month (`YYYY-MM`).
    Month(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DevicePageForm<'a> {
    office_id: &'static str,
    page_no: &'static str,
    page_size: &'static str,
    order_name: u8,
    order_type: u8,
    plantuid: &'a str,
    device_status: &'static str,
    local_date: &'a str,
    local_month: &'a str,
}

impl PortalClient {
    /// List the devices (inverters, batteries, meters) of a plant.
    ///
    /// `POST cloudMonitor/device/findDevicePageList` (form)
    pub async fn find_device_page_list(
        &self,
        plantuid: &str,
        scope: DeviceScope<'_>,
    ) -> Result<Value, Error> {
        debug!(plantuid, ?scope, "listing devices");
        let (office_id, month) = match scope {
            DeviceScope::Plant => ("", ""),
            DeviceScope::Month(month) => ("1", month),
        };
        let form = DevicePageForm {
            office_id,
            page_no: "",
            page_size: "",
            order_name: 1,
            order_type: 2,
            plantuid,
            device_status: "",
            local_date: month,
            local_month: month,
        };
        self.call(Method::POST, Endpoint::DevicePageList, Params::Form, &form)
            .await
    }
}
