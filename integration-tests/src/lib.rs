//! Scenarios shared by the end-to-end tests.

use latent_economics::EconomicAssumptions;
use latent_storage::{ClimateProfile, HeatSource, ThermalSystem, ThermalSystemConfig};
use uom::si::{
    f64::{MassRate, Power, ThermodynamicTemperature},
    mass_rate::kilogram_per_second,
    power::watt,
    thermodynamic_temperature::degree_celsius,
};

/// Assumptions for a store charged from the grid overnight and displacing
/// resistance heat at peak.
pub const GRID_CHARGED: &str = r#"
displaced_efficiency = 1.0
charging = "off_peak"
capital_cost = 4700.0
incentive = 0.0
discount_rate = 0.03
horizon_years = 20
cycles_per_year = 150.0
operating_cost = 0.0

[rates]
peak = 0.30
off_peak = 0.10

[carbon]
intensity_kg_per_kwh = 0.45
price_per_tonne = 50.0
"#;

#[must_use]
pub fn celsius(c: f64) -> ThermodynamicTemperature {
    ThermodynamicTemperature::new::<degree_celsius>(c)
}

/// The reference store with its default configuration.
///
/// # Panics
///
/// Never: the default configuration is valid.
#[must_use]
pub fn reference_system() -> ThermalSystem {
    ThermalSystem::new(ThermalSystemConfig::default()).expect("default configuration is valid")
}

#[must_use]
pub fn basement() -> ClimateProfile {
    ClimateProfile::constant("basement", celsius(20.0))
}

#[must_use]
pub fn garage() -> ClimateProfile {
    ClimateProfile::constant("garage", celsius(5.0))
}

#[must_use]
pub fn heater(watts: f64) -> HeatSource {
    HeatSource::Resistive(Power::new::<watt>(watts))
}

/// Loop flow through the store's plate exchanger.
#[must_use]
pub fn design_flow() -> MassRate {
    MassRate::new::<kilogram_per_second>(0.074)
}

/// Parses TOML economic assumptions, filling gaps from the defaults.
///
/// # Errors
///
/// Returns the parse error for malformed or mistyped input.
pub fn load_assumptions(text: &str) -> Result<EconomicAssumptions, toml::de::Error> {
    toml::from_str(text)
}
