//! Contest rules as data.
//!
//! All reference data the scorer needs — band plan, valid exchange token
//! sets, contest time window, bonus station list — lives in one immutable
//! `ContestRules` value constructed at startup and passed into the engine.
//! Defaults embed the South Carolina QSO Party rules; any subset can be
//! overridden from `~/.config/scqp-score/rules.toml` on Linux (or the
//! platform-appropriate location on other OSes), or a file named with
//! `--rules`.

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::qso::{Band, ExchangeCategory};

/// South Carolina county abbreviations.
const SC_COUNTIES: &str = "ABBE AIKE ALLE ANDE BAMB BARN BEAU BERK CHOU CHAR CHES CHFD \
                           CKEE CLRN COLL DARL DILL DORC EDGE FAIR FLOR GEOR GRWD GVIL \
                           HAMP HORR JASP KERS LAUR LEE LEXI LNCS MARI MARL MCOR NEWB \
                           OCON ORNG PICK RICH SALU SPAR SUMT UNIO WILL YORK";

/// Canadian provinces and territories.
const CANADIAN_PROVINCES: &str = "AB BC MB NB NL NS NT NU ON PE QC SK YT";

/// US states plus DC, minus SC (in-state contacts exchange a county).
const US_STATES: &str = "AL AK AZ AR CA CO CT DC DE FL GA HI ID IL IN IA KS KY LA ME \
                         MD MA MI MN MS MO MT NE NV NH NJ NM NY NC ND OH OK OR PA RI \
                         SD TN TX UT VT VA WA WV WI WY";

fn token_set(tokens: &str) -> BTreeSet<String> {
    tokens.split_whitespace().map(str::to_string).collect()
}

/// One inclusive frequency range in the band plan.
#[derive(Debug, Clone, Deserialize)]
pub struct BandRange {
    /// Lower edge in kHz, inclusive.
    pub low_khz: u32,

    /// Upper edge in kHz, inclusive.
    pub high_khz: u32,

    /// The band label for frequencies in this range.
    pub band: Band,
}

impl BandRange {
    fn contains(&self, freq_khz: u32) -> bool {
        freq_khz >= self.low_khz && freq_khz <= self.high_khz
    }
}

/// The full rule set for one contest.
///
/// Loaded once, never mutated. Multiple rule sets can coexist (tests
/// inject shrunken ones).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContestRules {
    /// Frequency-to-band mapping; ranges must be disjoint.
    pub band_plan: Vec<BandRange>,

    /// Valid US state exchange tokens.
    pub states: BTreeSet<String>,

    /// Valid Canadian province exchange tokens.
    pub provinces: BTreeSet<String>,

    /// Valid SC county exchange tokens.
    pub counties: BTreeSet<String>,

    /// Callsigns whose contacts earn bonus points.
    pub bonus_stations: BTreeSet<String>,

    /// Start of the contest window, inclusive.
    pub start: NaiveDateTime,

    /// End of the contest window, inclusive.
    pub end: NaiveDateTime,
}

impl Default for ContestRules {
    fn default() -> Self {
        let band_plan = [
            (1_800, 2_000, Band::B160),
            (3_500, 4_000, Band::B80),
            (7_000, 7_300, Band::B40),
            (14_000, 14_350, Band::B20),
            (21_000, 21_450, Band::B15),
            (28_000, 29_700, Band::B10),
            (50_000, 54_000, Band::B6),
        ]
        .into_iter()
        .map(|(low_khz, high_khz, band)| BandRange {
            low_khz,
            high_khz,
            band,
        })
        .collect();

        Self {
            band_plan,
            states: token_set(US_STATES),
            provinces: token_set(CANADIAN_PROVINCES),
            counties: token_set(SC_COUNTIES),
            bonus_stations: ["W4CAE", "WW4SF"].iter().map(|s| s.to_string()).collect(),
            start: NaiveDate::from_ymd_opt(2023, 2, 25)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 2, 26)
                .unwrap()
                .and_hms_opt(2, 0, 0)
                .unwrap(),
        }
    }
}

impl ContestRules {
    /// Load rules from an explicit file, or from the default location,
    /// falling back to the embedded SCQP defaults if no file exists.
    ///
    /// An explicit path that cannot be read or parsed is an error; a
    /// missing default-location file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::rules_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read rules file: {}", path.display()))?;
        let rules: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in rules file: {}", path.display()))?;
        rules
            .validate()
            .with_context(|| format!("Invalid rules in {}", path.display()))?;
        Ok(rules)
    }

    /// Returns the default rules file path.
    pub fn rules_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scqp-score/rules.toml"))
    }

    /// Check internal consistency of the rule set.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            bail!("contest window ends before it starts");
        }
        for (i, a) in self.band_plan.iter().enumerate() {
            if a.low_khz > a.high_khz {
                bail!("band range for {} has low > high", a.band);
            }
            for b in &self.band_plan[i + 1..] {
                if a.low_khz <= b.high_khz && b.low_khz <= a.high_khz {
                    bail!("band ranges for {} and {} overlap", a.band, b.band);
                }
            }
        }
        let pairs = [
            (&self.states, &self.provinces, "states", "provinces"),
            (&self.states, &self.counties, "states", "counties"),
            (&self.provinces, &self.counties, "provinces", "counties"),
        ];
        for (a, b, a_name, b_name) in pairs {
            if let Some(token) = a.intersection(b).next() {
                bail!("token {} appears in both {} and {}", token, a_name, b_name);
            }
        }
        for set in [&self.states, &self.provinces, &self.counties] {
            if set.contains("DX") {
                bail!("DX is reserved and cannot appear in a multiplier set");
            }
        }
        Ok(())
    }

    /// Map a frequency to its band, if any range contains it.
    pub fn band_for(&self, freq_khz: u32) -> Option<Band> {
        self.band_plan
            .iter()
            .find(|r| r.contains(freq_khz))
            .map(|r| r.band)
    }

    /// Classify an exchange token into its multiplier category.
    ///
    /// Returns `None` for tokens in no reference set; the token is
    /// matched uppercase.
    pub fn classify(&self, token: &str) -> Option<ExchangeCategory> {
        let token = token.to_ascii_uppercase();
        if token == "DX" {
            Some(ExchangeCategory::Dx)
        } else if self.states.contains(&token) {
            Some(ExchangeCategory::State)
        } else if self.provinces.contains(&token) {
            Some(ExchangeCategory::Province)
        } else if self.counties.contains(&token) {
            Some(ExchangeCategory::County)
        } else {
            None
        }
    }

    /// Whether a timestamp falls inside the contest window (inclusive).
    pub fn in_window(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Whether the worked callsign earns a bonus credit.
    pub fn is_bonus(&self, call: &str) -> bool {
        self.bonus_stations.contains(&call.to_ascii_uppercase())
    }

    /// The reference token set for a multiplier-bearing category.
    ///
    /// `Dx` has no reference set and returns an empty one.
    pub fn reference_set(&self, category: ExchangeCategory) -> &BTreeSet<String> {
        static EMPTY: BTreeSet<String> = BTreeSet::new();
        match category {
            ExchangeCategory::State => &self.states,
            ExchangeCategory::Province => &self.provinces,
            ExchangeCategory::County => &self.counties,
            ExchangeCategory::Dx => &EMPTY,
        }
    }
}
