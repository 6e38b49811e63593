/// ============================================================
///  Solar Geometry & Plane-of-Array Irradiance
///
///  Algorithm pipeline:
///   1. Solar geometry  – declination, equation of time, hour angle,
///                        elevation angle, azimuth angle
///   2. Extraterrestrial irradiance – eccentricity-corrected solar constant
///   3. Clear-sky model  – Bird & Hulstrom simplified: DNI, DHI
///   4. Observed cloud cover – attenuates beam and sky diffuse
///   5. Transposition    – beam, isotropic sky diffuse and ground
///                         reflection onto a fixed-tilt panel
/// ============================================================

use chrono::{DateTime, Datelike, Timelike, Utc};
use std::f64::consts::PI;

use crate::config::PanelConfig;
use crate::models::prediction::SolarParameters;

// ─── Physical constants ──────────────────────────────────────
const SC: f64 = 1361.0; // Solar constant W/m²
const DEG: f64 = PI / 180.0;
const MAX_DEFAULT_TILT_DEG: f64 = 60.0;

/// Sun position for one instant and place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub elevation_deg: f64,
    /// Degrees from North, clockwise
    pub azimuth_deg: f64,
    /// Day-angle used by the Spencer series (rad)
    day_angle: f64,
}

/// Spencer (1971) declination & equation of time, hour angle from local
/// solar time.
pub fn sun_position(lat_deg: f64, lon_deg: f64, utc: DateTime<Utc>) -> SunPosition {
    let doy = f64::from(utc.ordinal());
    let ut_h = f64::from(utc.hour())
        + f64::from(utc.minute()) / 60.0
        + f64::from(utc.second()) / 3600.0;

    let b = 2.0 * PI * (doy - 1.0) / 365.0;
    let decl = 0.006918
        - 0.399912 * b.cos()
        + 0.070257 * b.sin()
        - 0.006758 * (2.0 * b).cos()
        + 0.000907 * (2.0 * b).sin()
        - 0.002697 * (3.0 * b).cos()
        + 0.00148 * (3.0 * b).sin(); // rad

    let eot_min = 229.18
        * (0.000075
            + 0.001868 * b.cos()
            - 0.032077 * b.sin()
            - 0.014615 * (2.0 * b).cos()
            - 0.04089 * (2.0 * b).sin());

    // Local solar time (hours)
    let lst_h = (ut_h + lon_deg / 15.0 + eot_min / 60.0).rem_euclid(24.0);

    // Hour angle: negative in the morning
    let omega_deg = 15.0 * (lst_h - 12.0);
    let omega = omega_deg * DEG;

    let lat = lat_deg * DEG;
    let sin_alpha = lat.sin() * decl.sin() + lat.cos() * decl.cos() * omega.cos();
    let alpha = sin_alpha.clamp(-1.0, 1.0).asin();

    let denom = alpha.cos() * lat.cos();
    let cos_az = if denom.abs() > 1e-9 {
        (decl.sin() - sin_alpha * lat.sin()) / denom
    } else {
        0.0
    };
    let az_abs = cos_az.clamp(-1.0, 1.0).acos() / DEG;
    let azimuth_deg = if omega_deg > 0.0 { 360.0 - az_abs } else { az_abs };

    SunPosition {
        elevation_deg: alpha / DEG,
        azimuth_deg,
        day_angle: b,
    }
}

/// Clear-sky (DNI, DHI) in W/m² for a sun position; zero below the horizon.
fn clear_sky(sun: &SunPosition) -> (f64, f64) {
    if sun.elevation_deg <= 0.1 {
        return (0.0, 0.0);
    }
    let b = sun.day_angle;
    let e0 = SC * (1.00011
        + 0.034221 * b.cos()
        + 0.00128 * b.sin()
        + 0.000719 * (2.0 * b).cos()
        + 0.000077 * (2.0 * b).sin());

    let sin_alpha = (sun.elevation_deg * DEG).sin();

    // Air mass – Kasten & Young (1989)
    let am = (1.0 / (sin_alpha + 0.50572 * (sun.elevation_deg + 6.07995_f64).powf(-1.6364))).max(1.0);

    // Transmittances: Rayleigh, ozone (0.3 atm-cm), aerosol (Linke 3.0),
    // water vapour (1.5 cm)
    let tr = (-0.0903 * am.powf(0.84) * (1.0 + am - am.powf(1.01))).exp();
    let to = 1.0 - 0.0013 * am;
    let ta = (-0.09 * 3.0_f64.powf(0.978) * am.powf(0.9455)).exp();
    let tw = 1.0 - 0.0075 * am.powf(0.65);
    let total_t = tr * to * ta * tw;

    let dni = 0.9762 * e0 * total_t;
    let dhi = (0.79 * e0 * sin_alpha * (1.0 - total_t)
        * (0.5 * (1.0 - tr) + back_scatter(ta))
        / (1.0 - am + am.powf(1.02)))
    .max(0.0);
    (dni.max(0.0), dhi)
}

#[inline]
fn back_scatter(ta: f64) -> f64 {
    // Approximated from Bird (1981) Table 2
    0.5 * (0.92 - ta.ln().abs() / 10.0).clamp(0.2, 0.5)
}

/// Fraction of the sky that is clear, from cloud cover in percent.
pub fn clear_fraction(clouds_pct: f64) -> f64 {
    ((100.0 - clouds_pct) / 100.0).clamp(0.0, 1.0)
}

/// Plane-of-array irradiance for a panel at the given place and time under
/// the observed cloud cover.
pub fn solar_parameters(
    lat_deg: f64,
    lon_deg: f64,
    utc: DateTime<Utc>,
    clouds_pct: f64,
    panel: &PanelConfig,
) -> SolarParameters {
    let sun = sun_position(lat_deg, lon_deg, utc);
    let (dni_cs, dhi_cs) = clear_sky(&sun);

    let cf = clear_fraction(clouds_pct);
    let dni = dni_cs * cf;
    let dhi = dhi_cs * (0.5 + 0.5 * cf);

    // Equator-facing, tilt ≈ latitude unless configured
    let tilt_deg = panel
        .tilt_deg
        .unwrap_or_else(|| lat_deg.abs().min(MAX_DEFAULT_TILT_DEG));
    let surf_az_deg = panel
        .azimuth_deg
        .unwrap_or(if lat_deg >= 0.0 { 180.0 } else { 0.0 });
    let tilt = tilt_deg * DEG;

    let alpha = sun.elevation_deg * DEG;
    let az_diff = (sun.azimuth_deg - surf_az_deg) * DEG;
    let cos_theta = if sun.elevation_deg > 0.1 {
        (alpha.sin() * tilt.cos() + alpha.cos() * tilt.sin() * az_diff.cos()).max(0.0)
    } else {
        0.0
    };

    let ghi = (dni * alpha.sin().max(0.0) + dhi).max(0.0);

    SolarParameters {
        poa_direct: dni * cos_theta,
        poa_sky_diffuse: dhi * (1.0 + tilt.cos()) / 2.0,
        poa_ground_diffuse: ghi * panel.albedo * (1.0 - tilt.cos()) / 2.0,
        solar_elevation: sun.elevation_deg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn panel() -> PanelConfig {
        PanelConfig::default()
    }

    #[test]
    fn test_summer_noon_italy() {
        // Turin, Italy – summer solstice, close to solar noon
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 11, 30, 0).unwrap();
        let p = solar_parameters(45.07, 7.33, t, 0.0, &panel());
        assert!(p.solar_elevation > 60.0, "Elevation should be >60° at summer noon, got {:.1}", p.solar_elevation);
        assert!(p.poa_direct > 400.0, "Beam on panel should be significant, got {:.1}", p.poa_direct);
        assert!(p.poa_sky_diffuse > 0.0);
        assert!(p.poa_ground_diffuse > 0.0);
    }

    #[test]
    fn test_midnight_zero() {
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 22, 0, 0).unwrap();
        let p = solar_parameters(45.07, 7.33, t, 0.0, &panel());
        assert!(p.solar_elevation < 0.0);
        assert_eq!(p.poa_direct, 0.0);
        assert_eq!(p.poa_sky_diffuse, 0.0);
        assert_eq!(p.poa_ground_diffuse, 0.0);
    }

    #[test]
    fn test_winter_solstice() {
        let t = Utc.with_ymd_and_hms(2025, 12, 21, 11, 30, 0).unwrap();
        let sun = sun_position(45.07, 7.33, t);
        assert!(sun.elevation_deg > 15.0 && sun.elevation_deg < 35.0,
            "Winter elevation should be 15-35°, got {:.1}", sun.elevation_deg);
    }

    #[test]
    fn test_overcast_removes_beam_and_halves_diffuse() {
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 11, 30, 0).unwrap();
        let clear = solar_parameters(45.07, 7.33, t, 0.0, &panel());
        let overcast = solar_parameters(45.07, 7.33, t, 100.0, &panel());

        assert_eq!(overcast.poa_direct, 0.0);
        assert!((overcast.poa_sky_diffuse - clear.poa_sky_diffuse / 2.0).abs() < 1e-9);
        assert!(overcast.poa_ground_diffuse < clear.poa_ground_diffuse);
        assert_eq!(overcast.solar_elevation, clear.solar_elevation);
    }

    #[test]
    fn test_flat_panel_has_no_ground_reflection() {
        let t = Utc.with_ymd_and_hms(2025, 6, 21, 11, 30, 0).unwrap();
        let flat = PanelConfig { tilt_deg: Some(0.0), ..PanelConfig::default() };
        let p = solar_parameters(45.07, 7.33, t, 20.0, &flat);
        assert!(p.poa_ground_diffuse.abs() < 1e-9);
        assert!(p.poa_direct > 0.0);
    }

    #[test]
    fn test_clear_fraction_bounds() {
        assert_eq!(clear_fraction(40.0), 0.6);
        assert_eq!(clear_fraction(-5.0), 1.0);
        assert_eq!(clear_fraction(120.0), 0.0);
    }
}
