// ── Fetch cycle sequencer ──
//
// Runs the dependent chain of portal calls for one plant and folds every
// response into an `AggregateDocument`. Steps run strictly in order: each
// needs an identifier (plant uid, device serial, module serial) found in an
// earlier response. There is no retry inside a cycle; the first failure
// ends it.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info};

use esolar_api::{ChartWindow, DeviceScope, Endpoint, PortalClient};

use crate::config::{LoginPolicy, ModuleVariant};
use crate::document::AggregateDocument;
use crate::error::{CoreError, FetchStep};

/// Device type code of a battery in the device list.
const BATTERY_DEVICE_TYPE: i64 = 2;

/// Progress of the current (or last) fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "step", rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    Authenticating,
    FetchingBase(FetchStep),
    FetchingVariantExtras(FetchStep),
    Done,
    Failed(FetchStep),
}

impl FetchState {
    pub fn is_running(self) -> bool {
        matches!(
            self,
            Self::Authenticating | Self::FetchingBase(_) | Self::FetchingVariantExtras(_)
        )
    }
}

/// Identifiers discovered while walking the call chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleIds {
    pub plant_uid: String,
    pub device_sn: String,
    pub module_sn: Option<String>,
}

/// Result of a successful cycle.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub document: AggregateDocument,
    pub ids: CycleIds,
}

/// One fetch cycle over an exclusively held client.
pub struct Sequencer<'a> {
    client: &'a PortalClient,
    variant: ModuleVariant,
    plant_index: usize,
    login_policy: LoginPolicy,
    window: ChartWindow,
    state: &'a watch::Sender<FetchState>,
    current: FetchStep,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        client: &'a PortalClient,
        variant: ModuleVariant,
        plant_index: usize,
        login_policy: LoginPolicy,
        window: ChartWindow,
        state: &'a watch::Sender<FetchState>,
    ) -> Self {
        Self {
            client,
            variant,
            plant_index,
            login_policy,
            window,
            state,
            current: FetchStep::Login,
        }
    }

    /// Run the whole chain. On failure the state is left at
    /// [`FetchState::Failed`] with the failing step.
    pub async fn run(mut self) -> Result<CycleOutput, CoreError> {
        let result = self.run_steps().await;
        match &result {
            Ok(_) => {
                self.state.send_replace(FetchState::Done);
            }
            Err(e) => {
                let step = e.step().unwrap_or(self.current);
                self.state.send_replace(FetchState::Failed(step));
            }
        }
        result
    }

    async fn run_steps(&mut self) -> Result<CycleOutput, CoreError> {
        self.authenticate().await?;

        let mut doc = AggregateDocument::new();
        let window = self.window.clone();

        // ── Base chain ───────────────────────────────────────────────
        self.enter_base(FetchStep::PlantList);
        let plants = self
            .client
            .get_user_plant_list(&window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::PlantList, e))?;
        let plant_uid = plant_uid(&plants, self.plant_index)?;
        debug!(plant_uid, "plant resolved");

        self.enter_base(FetchStep::PlantDetail);
        let detail = self
            .client
            .get_plant_detail_info(&plant_uid, &window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::PlantDetail, e))?;
        // The plant list wins over the plant detail on shared keys.
        doc.merge(Endpoint::PlantDetailInfo, detail);
        doc.merge(Endpoint::UserPlantList, plants);

        self.enter_base(FetchStep::DeviceList);
        let devices = self
            .client
            .find_device_page_list(&plant_uid, DeviceScope::Plant)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::DeviceList, e))?;
        doc.merge(Endpoint::DevicePageList, devices);
        let device_sn = primary_device_sn(&doc, self.variant)?;
        debug!(device_sn, "primary device resolved");

        self.enter_base(FetchStep::PlantChart);
        let elec_devicesn = if self.variant.is_h1() { device_sn.as_str() } else { "" };
        let chart = self
            .client
            .get_plant_detail_chart(&plant_uid, &device_sn, elec_devicesn, &window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::PlantChart, e))?;
        doc.merge(Endpoint::PlantDetailChart, chart);

        // ── Variant extras ───────────────────────────────────────────
        let mut module_sn = None;
        match self.variant {
            ModuleVariant::Base => {}
            ModuleVariant::H1 => {
                self.enter_extras(FetchStep::StorePower);
                let power = self
                    .client
                    .get_store_device_power(&device_sn, &window)
                    .await
                    .map_err(|e| CoreError::from_api(FetchStep::StorePower, e))?;
                doc.merge(Endpoint::StoreDevicePower, power);
            }
            ModuleVariant::SajSec => {
                module_sn = Some(self.fetch_meter(&mut doc, &plant_uid, &window).await?);
            }
        }

        info!(
            plant_uid,
            variant = %self.variant,
            keys = doc.keys().count(),
            "fetch cycle complete"
        );

        Ok(CycleOutput {
            document: doc,
            ids: CycleIds {
                plant_uid,
                device_sn,
                module_sn,
            },
        })
    }

    async fn authenticate(&mut self) -> Result<(), CoreError> {
        self.current = FetchStep::Login;
        self.state.send_replace(FetchState::Authenticating);
        let result = match self.login_policy {
            LoginPolicy::EachCycle => self.client.login().await,
            LoginPolicy::WhenInvalidated => self.client.ensure_authenticated().await,
        };
        result.map_err(|e| CoreError::from_api(FetchStep::Login, e))
    }

    async fn fetch_meter(
        &mut self,
        doc: &mut AggregateDocument,
        plant_uid: &str,
        window: &ChartWindow,
    ) -> Result<String, CoreError> {
        self.enter_extras(FetchStep::MeterModules);
        let modules = self
            .client
            .get_plant_meter_module_list(plant_uid)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::MeterModules, e))?;
        let module_sn = first_module_sn(&modules).ok_or_else(|| CoreError::ModuleNotFound {
            plant_uid: plant_uid.to_owned(),
        })?;
        doc.merge_named(Endpoint::MeterModuleList, modules);
        debug!(module_sn, "meter module resolved");

        self.enter_extras(FetchStep::MeterDevices);
        let devices = self
            .client
            .find_device_page_list(plant_uid, DeviceScope::Month(&window.chart_month))
            .await
            .map_err(|e| CoreError::from_api(FetchStep::MeterDevices, e))?;
        doc.merge_named(Endpoint::DevicePageList, devices);

        self.enter_extras(FetchStep::MeterDetail);
        let detail = self
            .client
            .get_plant_meter_detail_info(plant_uid, window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::MeterDetail, e))?;
        doc.merge_named(Endpoint::MeterDetailInfo, detail);

        self.enter_extras(FetchStep::MeterEnergyPreview);
        let preview = self
            .client
            .get_plant_meter_energy_preview(plant_uid, &module_sn, window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::MeterEnergyPreview, e))?;
        doc.merge_named(Endpoint::MeterEnergyPreview, preview);

        self.enter_extras(FetchStep::MeterChart);
        let chart = self
            .client
            .get_plant_meter_chart_data(plant_uid, &module_sn, window)
            .await
            .map_err(|e| CoreError::from_api(FetchStep::MeterChart, e))?;
        doc.merge_named(Endpoint::MeterChartData, chart);

        Ok(module_sn)
    }

    fn enter_base(&mut self, step: FetchStep) {
        self.current = step;
        self.state.send_replace(FetchState::FetchingBase(step));
    }

    fn enter_extras(&mut self, step: FetchStep) {
        self.current = step;
        self.state.send_replace(FetchState::FetchingVariantExtras(step));
    }
}

// ── Identifier selection ─────────────────────────────────────────────

/// `plantList[index].plantuid` of the plant list response.
pub(crate) fn plant_uid(plants: &Value, index: usize) -> Result<String, CoreError> {
    let list = plants.get("plantList").and_then(Value::as_array);
    let available = list.map_or(0, Vec::len);
    list.and_then(|l| l.get(index))
        .and_then(|p| p.get("plantuid"))
        .and_then(scalar_string)
        .ok_or(CoreError::PlantNotFound { index, available })
}

/// Serial of the device the chart and storage calls are keyed on.
///
/// H1 plants use the first battery in the device list when there is one;
/// every plant falls back to the first serial of the plant detail.
pub(crate) fn primary_device_sn(
    doc: &AggregateDocument,
    variant: ModuleVariant,
) -> Result<String, CoreError> {
    if variant.is_h1() {
        let battery = doc
            .get("list")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .find(|item| item.get("type").and_then(scalar_i64) == Some(BATTERY_DEVICE_TYPE))
            .and_then(|item| item.get("devicesn"))
            .and_then(scalar_string);
        if let Some(sn) = battery {
            return Ok(sn);
        }
        debug!("no battery in device list, falling back to plant serial");
    }

    doc.get("plantDetail")
        .and_then(|d| d.get("snList"))
        .and_then(|l| l.get(0))
        .and_then(scalar_string)
        .ok_or_else(|| CoreError::DeviceNotFound {
            reason: "plant detail lists no device serial".into(),
        })
}

/// `moduleList[0].moduleSn` of the meter module response.
pub(crate) fn first_module_sn(modules: &Value) -> Option<String> {
    modules
        .get("moduleList")
        .and_then(|l| l.get(0))
        .and_then(|m| m.get("moduleSn"))
        .and_then(scalar_string)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
