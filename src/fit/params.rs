//! Fit parameters and the minimizer's initial state.

use serde::Serialize;

use crate::domain::ParamId;
use crate::error::AppError;

/// A model parameter with its current value and floating flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub id: ParamId,
    value: f64,
    floating: bool,
}

impl Parameter {
    pub fn new(id: ParamId, value: f64, floating: bool) -> Self {
        Self { id, value, floating }
    }

    /// Pin the parameter at `value`.
    pub fn fix(&mut self, value: f64) {
        self.value = value;
        self.floating = false;
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn is_floating(&self) -> bool {
        self.floating
    }
}

/// Starting values for every model parameter.
///
/// BAO amplitude and scale float unless `fix_bao`; the `1/r²` broadband term
/// floats unless `no_bband`. The higher broadband terms start fixed.
pub fn default_parameters(fix_bao: bool, no_bband: bool) -> Vec<Parameter> {
    ParamId::ALL
        .into_iter()
        .map(|id| match id {
            ParamId::Alpha => Parameter::new(id, 3.8, true),
            ParamId::Bias => Parameter::new(id, 0.17, true),
            ParamId::Beta => Parameter::new(id, 1.0, true),
            ParamId::BaoAmpl | ParamId::BaoScale => Parameter::new(id, 1.0, !fix_bao),
            ParamId::BbA1 => Parameter::new(id, 0.0, !no_bband),
            ParamId::BbA2 | ParamId::BbA3 => Parameter::new(id, 0.0, false),
        })
        .collect()
}

/// One entry of a minimizer state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSetting {
    pub name: String,
    pub value: f64,
    /// Initial step size; zero for fixed parameters.
    pub error: f64,
    pub fixed: bool,
}

/// Ordered parameter list handed to a minimizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterState {
    params: Vec<ParameterSetting>,
}

impl ParameterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, value: f64, error: f64) {
        self.params.push(ParameterSetting {
            name: name.into(),
            value,
            error,
            fixed: false,
        });
    }

    pub fn fix(&mut self, name: &str) -> Result<(), AppError> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| AppError::config(format!("No parameter named '{name}' to fix.")))?;
        param.fixed = true;
        Ok(())
    }

    pub fn settings(&self) -> &[ParameterSetting] {
        &self.params
    }

    pub fn values(&self) -> Vec<f64> {
        self.params.iter().map(|p| p.value).collect()
    }

    /// Indices of the parameters the minimizer may move.
    pub fn free_indices(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.fixed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_flags() {
        let params = default_parameters(false, false);
        assert_eq!(params.len(), 8);
        let floating: Vec<bool> = params.iter().map(|p| p.is_floating()).collect();
        assert_eq!(floating, [true, true, true, true, true, true, false, false]);
        assert_eq!(params[0].value(), 3.8);
        assert_eq!(params[1].value(), 0.17);

        let params = default_parameters(true, true);
        let floating: Vec<bool> = params.iter().map(|p| p.is_floating()).collect();
        assert_eq!(floating, [true, true, true, false, false, false, false, false]);
        assert_eq!(params[ParamId::BaoScale.index()].value(), 1.0);
    }

    #[test]
    fn fixing_keeps_value_pinned() {
        let mut p = Parameter::new(ParamId::Beta, 1.0, true);
        p.fix(1.4);
        assert!(!p.is_floating());
        assert_eq!(p.value(), 1.4);
    }

    #[test]
    fn state_tracks_free_parameters() {
        let mut state = ParameterState::new();
        state.add("a", 1.0, 0.1);
        state.add("b", 0.0, 0.0);
        state.add("c", -2.0, 0.2);
        state.fix("b").unwrap();
        assert!(state.fix("d").is_err());
        assert_eq!(state.free_indices(), vec![0, 2]);
        assert_eq!(state.values(), vec![1.0, 0.0, -2.0]);
        assert_eq!(state.index_of("c"), Some(2));
        assert_eq!(state.settings().len(), 3);
    }
}
