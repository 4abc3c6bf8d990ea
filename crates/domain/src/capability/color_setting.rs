//! Color setting capability — the only multi-instance kind.
//!
//! A color setting advertises up to two sub-models: a direct color model
//! (HSV or RGB) and a color temperature range. The observed value is a single
//! slot holding whichever sub-model was assigned last, so the two families
//! can never be active at the same time.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, ValidationError};
use crate::value::ValueCell;

use super::{
    CapabilityParameters, CapabilitySpecification, CapabilityType, ChangeFuture, ChangeHandler,
    ChangeOptions, ChangeRequest, StateRecord, StateValue, invalid_value, unsupported,
};

/// HSV color triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    /// Hue, degrees `0..=360`.
    pub h: u16,
    /// Saturation, percent.
    pub s: u8,
    /// Value, percent.
    pub v: u8,
}

/// Which direct color model the device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorModelKind {
    Hsv,
    Rgb,
}

impl ColorModelKind {
    /// The instance name requests for this model arrive under.
    #[must_use]
    pub fn instance(self) -> &'static str {
        match self {
            Self::Hsv => "hsv",
            Self::Rgb => "rgb",
        }
    }
}

/// Supported color temperature range in kelvins; both bounds optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemperatureRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

/// The instance name temperature requests arrive under.
const TEMPERATURE_INSTANCE: &str = "temperature_k";

/// One concrete color value; exactly one sub-model is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorValue {
    Hsv(Hsv),
    Rgb(u32),
    TemperatureK(u32),
}

impl ColorValue {
    /// The instance name this value surfaces under.
    #[must_use]
    pub fn instance(self) -> &'static str {
        match self {
            Self::Hsv(_) => "hsv",
            Self::Rgb(_) => "rgb",
            Self::TemperatureK(_) => TEMPERATURE_INSTANCE,
        }
    }

    fn to_state_value(self) -> StateValue {
        match self {
            Self::Hsv(hsv) => StateValue::Hsv(hsv),
            Self::Rgb(rgb) => StateValue::Int(i64::from(rgb)),
            Self::TemperatureK(kelvin) => StateValue::Int(i64::from(kelvin)),
        }
    }
}

/// Parameters block: `{color_model?, temperature_k?}`.
#[derive(Debug, Clone, Serialize)]
pub struct ColorParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_model: Option<ColorModelKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_k: Option<TemperatureRange>,
}

/// Color control: direct color and/or color temperature.
#[derive(Debug, Clone)]
pub struct ColorSetting {
    color_model: Option<ColorModelKind>,
    temperature: Option<TemperatureRange>,
    value: ValueCell<ColorValue>,
    retrievable: bool,
    reportable: bool,
    on_change: Option<ChangeHandler<ColorValue>>,
}

/// Fallible builder for [`ColorSetting`].
#[derive(Debug, Default)]
pub struct ColorSettingBuilder {
    color_model: Option<ColorModelKind>,
    temperature: Option<TemperatureRange>,
    initial: Option<ColorValue>,
    retrievable: bool,
    reportable: bool,
}

impl ColorSetting {
    /// Start building a color setting. At least one sub-model must be
    /// declared before [`build`](ColorSettingBuilder::build).
    #[must_use]
    pub fn builder() -> ColorSettingBuilder {
        ColorSettingBuilder::default()
    }

    /// Install the change handler (late binding; see module docs).
    pub fn set_change_handler(&mut self, handler: ChangeHandler<ColorValue>) {
        self.on_change = Some(handler);
    }

    /// Instance names this capability answers to, color model first.
    #[must_use]
    pub fn instances(&self) -> Vec<&'static str> {
        let mut instances = Vec::with_capacity(2);
        if let Some(model) = self.color_model {
            instances.push(model.instance());
        }
        if self.temperature.is_some() {
            instances.push(TEMPERATURE_INSTANCE);
        }
        instances
    }

    #[must_use]
    pub fn is_retrievable(&self) -> bool {
        self.retrievable
    }

    #[must_use]
    pub fn is_reportable(&self) -> bool {
        self.reportable
    }

    /// Record an observed color; replaces whichever sub-model was active.
    /// Clears any pending query fault.
    pub fn set(&self, value: ColorValue) {
        self.value.set(value);
    }

    /// Raise a query fault on this facet.
    pub fn fail(&self, error: QueryError) {
        self.value.fail(error);
    }

    /// Currently active color value.
    ///
    /// # Errors
    ///
    /// Propagates a driver-raised query fault.
    ///
    /// # Panics
    ///
    /// Panics when the capability is not retrievable.
    pub fn value(&self) -> Result<Option<ColorValue>, QueryError> {
        assert!(
            self.retrievable,
            "value() read on non-retrievable color_setting capability"
        );
        self.value.read()
    }

    pub(super) fn specification(&self) -> CapabilitySpecification {
        CapabilitySpecification {
            type_id: CapabilityType::ColorSetting,
            retrievable: self.retrievable,
            reportable: self.reportable,
            parameters: Some(CapabilityParameters::ColorSetting(ColorParameters {
                color_model: self.color_model,
                temperature_k: self.temperature,
            })),
        }
    }

    pub(super) fn current(&self) -> Result<Option<StateRecord>, QueryError> {
        Ok(self.value.read()?.map(|value| {
            StateRecord::capability(
                CapabilityType::ColorSetting,
                value.instance(),
                value.to_state_value(),
            )
        }))
    }

    pub(super) fn dispatch(
        &self,
        instance: &str,
        value: &serde_json::Value,
        options: ChangeOptions,
    ) -> ChangeFuture {
        let decoded = match instance {
            "hsv" => serde_json::from_value::<Hsv>(value.clone())
                .ok()
                .map(ColorValue::Hsv),
            "rgb" => value
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(ColorValue::Rgb),
            TEMPERATURE_INSTANCE => value
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(ColorValue::TemperatureK),
            _ => None,
        };
        let Some(requested) = decoded else {
            return invalid_value(
                CapabilityType::ColorSetting,
                instance,
                "expected a color value matching the requested instance",
            );
        };
        match &self.on_change {
            Some(handler) => handler.invoke(ChangeRequest {
                instance: instance.to_string(),
                value: requested,
                options,
            }),
            None => unsupported(CapabilityType::ColorSetting, instance),
        }
    }
}

impl ColorSettingBuilder {
    /// Declare the direct color model.
    #[must_use]
    pub fn color_model(mut self, model: ColorModelKind) -> Self {
        self.color_model = Some(model);
        self
    }

    /// Declare color temperature support.
    #[must_use]
    pub fn temperature(mut self, range: TemperatureRange) -> Self {
        self.temperature = Some(range);
        self
    }

    /// Seed the observed value.
    #[must_use]
    pub fn initial(mut self, value: ColorValue) -> Self {
        self.initial = Some(value);
        self
    }

    /// Mark the value as queryable.
    #[must_use]
    pub fn retrievable(mut self, retrievable: bool) -> Self {
        self.retrievable = retrievable;
        self
    }

    /// Mark value changes as push-notification eligible.
    #[must_use]
    pub fn reportable(mut self, reportable: bool) -> Self {
        self.reportable = reportable;
        self
    }

    /// Validate and build the capability.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyColorSetting`] when neither a color
    /// model nor a temperature range is declared, or when the initial value
    /// uses a sub-model that is not declared.
    pub fn build(self) -> Result<ColorSetting, ValidationError> {
        if self.color_model.is_none() && self.temperature.is_none() {
            return Err(ValidationError::EmptyColorSetting);
        }
        if let Some(initial) = self.initial {
            let declared = match initial {
                ColorValue::Hsv(_) => self.color_model == Some(ColorModelKind::Hsv),
                ColorValue::Rgb(_) => self.color_model == Some(ColorModelKind::Rgb),
                ColorValue::TemperatureK(_) => self.temperature.is_some(),
            };
            if !declared {
                return Err(ValidationError::EmptyColorSetting);
            }
        }
        Ok(ColorSetting {
            color_model: self.color_model,
            temperature: self.temperature,
            value: ValueCell::new(self.initial),
            retrievable: self.retrievable,
            reportable: self.reportable,
            on_change: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionErrorCode;

    #[test]
    fn should_reject_color_setting_without_sub_models() {
        let result = ColorSetting::builder().build();
        assert!(matches!(result, Err(ValidationError::EmptyColorSetting)));
    }

    #[test]
    fn should_expose_both_sub_model_instances() {
        let cap = ColorSetting::builder()
            .color_model(ColorModelKind::Hsv)
            .temperature(TemperatureRange::default())
            .build()
            .unwrap();
        assert_eq!(cap.instances(), vec!["hsv", "temperature_k"]);
    }

    #[test]
    fn should_serialize_specification_with_empty_temperature_range() {
        let cap = ColorSetting::builder()
            .color_model(ColorModelKind::Hsv)
            .temperature(TemperatureRange::default())
            .retrievable(true)
            .build()
            .unwrap();
        let json = serde_json::to_value(cap.specification()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "devices.capabilities.color_setting",
                "retrievable": true,
                "reportable": false,
                "parameters": {"color_model": "hsv", "temperature_k": {}},
            })
        );
    }

    #[test]
    fn should_surface_only_most_recent_sub_model() {
        let cap = ColorSetting::builder()
            .color_model(ColorModelKind::Hsv)
            .temperature(TemperatureRange::default())
            .initial(ColorValue::Hsv(Hsv { h: 1, s: 2, v: 3 }))
            .retrievable(true)
            .build()
            .unwrap();

        let record = cap.current().unwrap().unwrap();
        assert_eq!(record.state.instance, "hsv");

        cap.set(ColorValue::TemperatureK(6000));
        let record = cap.current().unwrap().unwrap();
        assert_eq!(record.state.instance, "temperature_k");
        assert_eq!(record.state.value, StateValue::Int(6000));
    }

    #[test]
    fn should_reject_initial_value_for_undeclared_sub_model() {
        let result = ColorSetting::builder()
            .temperature(TemperatureRange::default())
            .initial(ColorValue::Hsv(Hsv { h: 0, s: 0, v: 0 }))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn should_decode_hsv_request_value() {
        let mut cap = ColorSetting::builder()
            .color_model(ColorModelKind::Hsv)
            .build()
            .unwrap();
        let observed = cap.clone();
        cap.set_change_handler(ChangeHandler::new(move |req: ChangeRequest<ColorValue>| {
            observed.set(req.value);
            let applied = super::super::Applied::new(CapabilityType::ColorSetting, req.instance);
            Box::pin(async move { Ok(applied) })
        }));

        cap.dispatch(
            "hsv",
            &serde_json::json!({"h": 120, "s": 50, "v": 80}),
            ChangeOptions::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn should_reject_malformed_hsv_value() {
        let cap = ColorSetting::builder()
            .color_model(ColorModelKind::Hsv)
            .build()
            .unwrap();
        let err = cap
            .dispatch("hsv", &serde_json::json!(42), ChangeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ActionErrorCode::InvalidValue);
    }
}
