//! Equal-loudness contours
//!
//! Converts between sound pressure level (dB SPL) and perceived loudness
//! (phons) at a given frequency.
//!
//! # How the Contours Work
//!
//! The ear is not equally sensitive at every frequency. A 50 Hz tone has to be
//! far louder than a 3 kHz tone to *sound* equally loud. The phon scale
//! captures this: a sound of N phons is as loud as a 1 kHz tone at N dB SPL.
//!
//! The model uses three parameters per frequency, tabulated at 29 standard
//! frequencies from 20 Hz to 12.5 kHz:
//!
//! ```text
//! Tf  threshold of hearing (dB)
//! af  exponent for loudness perception
//! Lu  magnitude of the linear transfer function normalized at 1 kHz (dB)
//! ```
//!
//! Between table frequencies the parameters are linearly interpolated; outside
//! the table the nearest endpoint is used unchanged (no extrapolation).

const FREQUENCIES: [f64; 29] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0,
];

const AF: [f64; 29] = [
    0.532, 0.506, 0.480, 0.455, 0.432, 0.409, 0.387, 0.367, 0.349, 0.330, 0.315, 0.301, 0.288,
    0.276, 0.267, 0.259, 0.253, 0.250, 0.246, 0.244, 0.243, 0.243, 0.243, 0.242, 0.242, 0.245,
    0.254, 0.271, 0.301,
];

const LU: [f64; 29] = [
    -31.6, -27.2, -23.0, -19.1, -15.9, -13.0, -10.3, -8.1, -6.2, -4.5, -3.1, -2.0, -1.1, -0.4,
    0.0, 0.3, 0.5, 0.0, -2.7, -4.1, -1.0, 1.7, 2.5, 1.2, -2.1, -7.1, -11.2, -10.7, -3.1,
];

const TF: [f64; 29] = [
    78.5, 68.7, 59.5, 51.1, 44.0, 37.5, 31.5, 26.5, 22.1, 17.9, 14.4, 11.4, 8.6, 6.2, 4.4, 3.0,
    2.2, 2.4, 3.5, 1.7, -1.3, -4.2, -6.0, -5.4, -1.5, 6.0, 12.6, 13.9, 12.3,
];

/// Contour parameters at one frequency
#[derive(Debug, Clone, Copy, PartialEq)]
struct Contour {
    tf: f64,
    af: f64,
    lu: f64,
}

impl Contour {
    fn at(frequency: f64) -> Self {
        Self {
            tf: interpolate(&TF, frequency),
            af: interpolate(&AF, frequency),
            lu: interpolate(&LU, frequency),
        }
    }

    /// Threshold term shared by both directions of the conversion
    fn threshold_term(&self) -> f64 {
        (0.4 * 10f64.powf(((self.tf + self.lu) / 10.0) - 9.0)).powf(self.af)
    }
}

/// Sound pressure level (dB) needed at `frequency` to be heard as `phons`
pub fn phons_to_db(phons: f64, frequency: f64) -> f64 {
    let contour = Contour::at(frequency);

    let a = 0.00447 * (10f64.powf(0.025 * phons) - 1.15);
    let af = a + contour.threshold_term();

    (10.0 / contour.af) * af.log10() - contour.lu + 94.0
}

/// Perceived loudness (phons) of a `db` SPL tone at `frequency`
pub fn db_to_phons(db: f64, frequency: f64) -> f64 {
    let contour = Contour::at(frequency);

    let a = 10f64.powf((contour.af / 10.0) * (db + contour.lu - 94.0));
    let af = a - contour.threshold_term();

    40.0 * ((af / 0.00447) + 1.15).log10()
}

/// Piecewise-linear lookup into one of the contour tables, clamped at both ends
fn interpolate(values: &[f64; 29], frequency: f64) -> f64 {
    if frequency <= FREQUENCIES[0] {
        return values[0];
    }
    if frequency >= FREQUENCIES[FREQUENCIES.len() - 1] {
        return values[values.len() - 1];
    }

    // First table frequency at or above the requested one
    let upper = FREQUENCIES.partition_point(|&f| f < frequency);
    if FREQUENCIES[upper] == frequency {
        return values[upper];
    }
    let lower = upper - 1;

    let position = (frequency - FREQUENCIES[lower]) / (FREQUENCIES[upper] - FREQUENCIES[lower]);
    values[lower] + (values[upper] - values[lower]) * position
}
