//! Build-time feature flags (`BUILD`) exposed to the runtime via app data

use serde::Serialize;

use crate::domain::entities::ComponentMeta;
use crate::domain::value_objects::OutputTargetKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFeatures {
    pub lazy_load: bool,
    pub hydrate_client_side: bool,
    pub hydrate_server_side: bool,
    pub member: bool,
    pub prop: bool,
    pub state: bool,
    pub event: bool,
    pub method: bool,
    pub listener: bool,
    pub shadow_dom: bool,
    pub style: bool,
    pub is_dev: bool,
}

impl BuildFeatures {
    /// Flags for a bundle of `kind` containing `components`
    pub fn for_output(components: &[ComponentMeta], kind: OutputTargetKind, dev_mode: bool) -> Self {
        let any = |f: fn(&ComponentMeta) -> bool| components.iter().any(f);
        let mut features = Self {
            prop: any(|c| !c.props.is_empty()),
            state: any(|c| !c.states.is_empty()),
            event: any(|c| !c.events.is_empty()),
            method: any(|c| !c.methods.is_empty()),
            listener: any(|c| !c.listeners.is_empty()),
            shadow_dom: any(|c| c.shadow),
            style: any(|c| !c.style_urls.is_empty()),
            is_dev: dev_mode,
            ..Self::default()
        };
        features.member = features.prop || features.state || features.method;

        match kind {
            OutputTargetKind::Lazy => features.lazy_load = true,
            OutputTargetKind::Hydrate => {
                features.hydrate_server_side = true;
                features.hydrate_client_side = true;
            }
            OutputTargetKind::CustomElement | OutputTargetKind::Collection => {}
        }
        features
    }

    /// `export const BUILD = {...};`
    pub fn render(&self) -> Result<String, serde_json::Error> {
        Ok(format!("export const BUILD = {};\n", serde_json::to_string(self)?))
    }
}
