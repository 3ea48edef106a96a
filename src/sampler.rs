//! Weighted demographic sampler.
//!
//! Draws the eight base fields of a persona from fixed discrete
//! distributions approximating the Iranian elderly population. The caller
//! supplies the random source, so a seeded `StdRng` gives reproducible
//! batches; there is no process-global seed.

use crate::types::{
    BasePersona, ChildrenBand, Ethnicity, Gender, LivingSituation, MaritalStatus, Religion,
};
use rand::Rng;

const GENDER: &[(Gender, u32)] = &[(Gender::Female, 53), (Gender::Male, 47)];

const MARITAL_STATUS: &[(MaritalStatus, u32)] = &[
    (MaritalStatus::Married, 60),
    (MaritalStatus::Single, 30),
    (MaritalStatus::Divorced, 5),
    (MaritalStatus::Widowed, 5),
];

const CHILDREN: &[(ChildrenBand, u32)] = &[
    (ChildrenBand::None, 5),
    (ChildrenBand::One, 15),
    (ChildrenBand::TwoToThree, 30),
    (ChildrenBand::FourPlus, 50),
];

const LIVING_SITUATION: &[(LivingSituation, u32)] = &[
    (LivingSituation::WithFamily, 50),
    (LivingSituation::Alone, 30),
    (LivingSituation::Shared, 20),
];

const ETHNICITY: &[(Ethnicity, u32)] = &[
    (Ethnicity::Persian, 50),
    (Ethnicity::Azeri, 25),
    (Ethnicity::Kurdish, 10),
    (Ethnicity::Lur, 5),
    (Ethnicity::Baloch, 3),
    (Ethnicity::Arab, 2),
    (Ethnicity::Turkmen, 1),
    (Ethnicity::Gilaki, 2),
    (Ethnicity::Mazandarani, 1),
    (Ethnicity::Qashqai, 1),
];

/// Ages 65-94, grouped into ten 3-year bands with decaying weights.
/// Within a band the age is uniform. The weights are non-increasing, so
/// the distribution never favors an older band over a younger one.
const AGE_BAND_WEIGHTS: [u32; 10] = [25, 20, 15, 15, 10, 10, 5, 3, 2, 1];
const AGE_MIN: u32 = 65;
const AGE_BAND_WIDTH: u32 = 3;

/// Draw one value from a literal weight table. Tables are non-empty with
/// positive weights, so this cannot fail.
fn pick<T: Copy>(rng: &mut impl Rng, table: &[(T, u32)]) -> T {
    let total: u32 = table.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (item, weight) in table {
        if roll < *weight {
            return *item;
        }
        roll -= weight;
    }
    table[table.len() - 1].0
}

fn sample_age(rng: &mut impl Rng) -> u32 {
    let bands: Vec<(u32, u32)> = AGE_BAND_WEIGHTS
        .iter()
        .enumerate()
        .map(|(i, &w)| (i as u32, w))
        .collect();
    let band = pick(rng, &bands);
    let start = AGE_MIN + band * AGE_BAND_WIDTH;
    rng.gen_range(start..start + AGE_BAND_WIDTH)
}

/// Religion is conditioned on ethnicity: the Shia share differs between
/// the Persian-speaking group, the predominantly Sunni ethnicities, Arabs,
/// and everyone else.
fn sample_religion(rng: &mut impl Rng, ethnicity: Ethnicity) -> Religion {
    use Ethnicity::*;
    match ethnicity {
        Persian | Azeri | Gilaki | Mazandarani => pick(
            rng,
            &[(Religion::ShiaMuslim, 95), (Religion::SunniMuslim, 5)],
        ),
        Kurdish | Baloch | Turkmen => pick(
            rng,
            &[(Religion::SunniMuslim, 80), (Religion::ShiaMuslim, 20)],
        ),
        Arab => pick(
            rng,
            &[(Religion::ShiaMuslim, 70), (Religion::SunniMuslim, 30)],
        ),
        _ => pick(
            rng,
            &[
                (Religion::ShiaMuslim, 85),
                (Religion::SunniMuslim, 10),
                (Religion::Zoroastrian, 2),
                (Religion::Christian, 2),
                (Religion::Jewish, 1),
            ],
        ),
    }
}

/// Sample one persona base record. Each field is drawn independently
/// except language (deterministic from ethnicity) and religion
/// (ethnicity-conditioned).
pub fn sample_base_persona(rng: &mut impl Rng) -> BasePersona {
    let ethnicity = pick(rng, ETHNICITY);
    BasePersona {
        age: sample_age(rng),
        gender: pick(rng, GENDER),
        marital_status: pick(rng, MARITAL_STATUS),
        children: pick(rng, CHILDREN),
        living_situation: pick(rng, LIVING_SITUATION),
        ethnicity,
        language: ethnicity.language().to_string(),
        religion_and_sect: sample_religion(rng, ethnicity),
    }
}
