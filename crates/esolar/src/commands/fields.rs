//! `esolar fields`: the catalog for the active variant. Needs no network.

use serde::Serialize;
use tabled::Tabled;

use esolar_core::{FieldSchema, FieldSpec, ModuleVariant};

use crate::cli::{FieldsArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct FieldInfo {
    key: String,
    module: String,
    unit: Option<String>,
    path: String,
}

impl From<&FieldSpec> for FieldInfo {
    fn from(spec: &FieldSpec) -> Self {
        Self {
            key: spec.key.clone(),
            module: spec.module.to_string(),
            unit: spec.unit.map(|u| u.to_string()),
            path: spec.path.to_string(),
        }
    }
}

#[derive(Tabled)]
struct FieldInfoRow {
    #[tabled(rename = "Field")]
    key: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Unit")]
    unit: String,
}

#[derive(Tabled)]
struct FieldPathRow {
    #[tabled(rename = "Field")]
    key: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Path")]
    path: String,
}

pub fn handle(args: &FieldsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (variant, plant_index) = active_variant(global)?;
    let schema = FieldSchema::for_variant(variant, plant_index);
    let infos: Vec<FieldInfo> = schema.iter().map(FieldInfo::from).collect();

    let rendered = if args.paths {
        output::render_list(
            global.output,
            &infos,
            |f| FieldPathRow {
                key: f.key.clone(),
                module: f.module.clone(),
                unit: f.unit.clone().unwrap_or_default(),
                path: f.path.clone(),
            },
            |f| format!("{}\t{}", f.key, f.path),
        )?
    } else {
        output::render_list(
            global.output,
            &infos,
            |f| FieldInfoRow {
                key: f.key.clone(),
                module: f.module.clone(),
                unit: f.unit.clone().unwrap_or_default(),
            },
            |f| f.key.clone(),
        )?
    };

    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Variant and plant index from flags, then the profile, then defaults.
fn active_variant(global: &GlobalOpts) -> Result<(ModuleVariant, usize), CliError> {
    let cfg = super::load_config(global).unwrap_or_default();
    let profile = cfg.profile(global.profile.as_deref()).ok().map(|(_, p)| p);

    let raw = global
        .variant
        .as_deref()
        .or_else(|| profile.and_then(|p| p.variant.as_deref()));
    let variant = esolar_config::parse_variant(raw)?;
    let plant_index = global
        .plant_index
        .or_else(|| profile.map(|p| p.plant_index))
        .unwrap_or(0);

    Ok((variant, plant_index))
}
