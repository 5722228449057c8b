// Portal endpoint catalogue
//
// Every call the acquisition pipeline makes, with its application-relative
// path and the name it is known by in logs and in the aggregate document.

/// A monitor endpoint of the eSolar portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    UserPlantList,
    PlantDetailInfo,
    DevicePageList,
    PlantDetailChart,
    StoreDevicePower,
    MeterModuleList,
    MeterDetailInfo,
    MeterEnergyPreview,
    MeterChartData,
}

impl Endpoint {
    /// Path relative to the provider's application root.
    ///
    /// The module list really is served under `cloudmonitor` (lower case m)
    /// while devices live under `cloudMonitor`.
    pub fn path(self) -> &'static str {
        match self {
            Self::UserPlantList => "monitor/site/getUserPlantList",
            Self::PlantDetailInfo => "monitor/site/getPlantDetailInfo",
            Self::DevicePageList => "cloudMonitor/device/findDevicePageList",
            Self::PlantDetailChart => "monitor/site/getPlantDetailChart2",
            Self::StoreDevicePower => "monitor/site/getStoreOrAcDevicePowerInfo",
            Self::MeterModuleList => "cloudmonitor/plantMeterModule/getPlantMeterModuleList",
            Self::MeterDetailInfo => "monitor/site/getPlantMeterDetailInfo",
            Self::MeterEnergyPreview => "monitor/site/getPlantMeterEnergyPreviewInfo",
            Self::MeterChartData => "monitor/site/getPlantMeterChartData",
        }
    }

    /// The portal's own name for the call (last path segment).
    pub fn name(self) -> &'static str {
        let path = self.path();
        path.rsplit('/').next().unwrap_or(path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
