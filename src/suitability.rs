//! Crop suitability scoring.
//!
//! Conditions are compared to each species' ideal as a seven-component
//! vector (N, P, K, temperature, humidity, pH, rainfall); the score falls
//! off with the Euclidean distance between the two.

use serde::Serialize;

use crate::{
    catalog::{IdealConditions, Species, MIN_SUITABILITY},
    components::{Environment, SoilPlot},
};

const SCORE_SCALE: f64 = 3000.0;
const PERFECT_SCORE: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SoilReading {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilReading {
    /// Field-wide estimate derived from the weather alone.
    pub fn from_environment(env: &Environment) -> Self {
        Self {
            n: 40.0 + env.rain / 10.0,
            p: 40.0,
            k: 40.0,
            temperature: env.temperature_c,
            humidity: env.sun,
            ph: 6.5,
            rainfall: env.rain * 2.5,
        }
    }

    /// Reading for one plot: its own chemistry under the shared weather.
    pub fn for_plot(env: &Environment, soil: &SoilPlot) -> Self {
        Self {
            n: soil.nitrogen,
            p: soil.phosphorus,
            k: soil.potassium,
            ph: soil.ph,
            ..Self::from_environment(env)
        }
    }

    fn distance_to(&self, ideal: &IdealConditions) -> f64 {
        [
            self.n - ideal.n,
            self.p - ideal.p,
            self.k - ideal.k,
            self.temperature - ideal.temperature,
            self.humidity - ideal.humidity,
            self.ph - ideal.ph,
            self.rainfall - ideal.rainfall,
        ]
        .iter()
        .map(|delta| delta * delta)
        .sum::<f64>()
        .sqrt()
    }
}

pub fn score(reading: &SoilReading, species: Species) -> f64 {
    let distance = reading.distance_to(&species.profile().ideal);
    if distance == 0.0 {
        PERFECT_SCORE
    } else {
        SCORE_SCALE / distance
    }
}

pub fn is_viable(score: f64) -> bool {
    score >= MIN_SUITABILITY
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation {
    pub species: Species,
    pub score: f64,
    pub viable: bool,
}

/// Species ranked best first, at most `top` of them.
pub fn recommend(reading: &SoilReading, top: usize) -> Vec<Recommendation> {
    let mut ranked: Vec<Recommendation> = Species::ALL
        .into_iter()
        .map(|species| {
            let score = score(reading, species);
            Recommendation {
                species,
                score,
                viable: is_viable(score),
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top);
    ranked
}
