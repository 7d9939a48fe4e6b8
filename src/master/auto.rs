//! Picks a platform and parameter set from an analysis report.

use std::fmt;

use serde::Serialize;

use super::preset::{Platform, UserParams};
use crate::analysis::spectrum::BalanceIssue;
use crate::analysis::AnalysisReport;
use crate::audio::signal::SILENCE_DB;

/// Lower bound on the reported confidence.
const MIN_CONFIDENCE: u8 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Edm,
    HipHop,
    Pop,
    Rock,
    Acoustic,
    Electronic,
}

impl Genre {
    pub fn name(&self) -> &'static str {
        match self {
            Genre::Edm => "edm",
            Genre::HipHop => "hip-hop",
            Genre::Pop => "pop",
            Genre::Rock => "rock",
            Genre::Acoustic => "acoustic",
            Genre::Electronic => "electronic",
        }
    }

    /// Destination platform and the loudness it is mastered to.
    fn destination(&self) -> (Platform, f32) {
        match self {
            Genre::Edm | Genre::HipHop => (Platform::Soundcloud, -11.0),
            Genre::Pop | Genre::Electronic => (Platform::Spotify, -14.0),
            Genre::Rock => (Platform::Youtube, -14.0),
            Genre::Acoustic => (Platform::Apple, -16.0),
        }
    }

    fn base_compression(&self) -> u8 {
        match self {
            Genre::Edm => 8,
            Genre::HipHop => 7,
            Genre::Pop => 5,
            Genre::Rock | Genre::Electronic => 6,
            Genre::Acoustic => 3,
        }
    }

    /// Saturation percent.
    fn warmth(&self) -> f32 {
        match self {
            Genre::Edm => 30.0,
            Genre::HipHop | Genre::Rock => 25.0,
            Genre::Pop | Genre::Electronic => 20.0,
            Genre::Acoustic => 10.0,
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A detected problem and the correction the chain applies for it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Problem {
    pub issue: String,
    pub fix: &'static str,
    pub severity: Severity,
}

#[derive(Clone, Debug, Serialize)]
pub struct AutoDecision {
    pub genre: Genre,
    /// Percent.
    pub genre_confidence: u8,
    pub platform: Platform,
    pub params: UserParams,
    /// One line per parameter explaining the choice.
    pub reasons: Vec<String>,
    pub problems: Vec<Problem>,
    /// Percent, never below 60.
    pub confidence: u8,
}

/// Either a full parameter set or the reason none could be derived.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Applied(AutoDecision),
    Fallback { reason: String },
}

pub fn decide(report: &AnalysisReport) -> Decision {
    if report.frequency_balance.spectrum.total_energy() <= 0.0
        || report.loudness.integrated_lufs <= SILENCE_DB
    {
        return Decision::Fallback {
            reason: "input is silent".into(),
        };
    }
    if !report.dynamics.crest_factor_db.is_finite() {
        return Decision::Fallback {
            reason: "dynamics could not be measured".into(),
        };
    }

    let (genre, genre_confidence) = detect_genre(report);
    let (platform, target_lufs) = genre.destination();
    let mut reasons = vec![format!(
        "Platform: {} at {} LUFS for {}",
        platform, target_lufs, genre
    )];

    let (bass, mids, highs) = equalization(report, &mut reasons);

    let compression = compression_level(genre, report.dynamics.crest_factor_db);
    reasons.push(format!(
        "Compression: {}/10 (crest factor {:.1} dB)",
        compression, report.dynamics.crest_factor_db
    ));

    let width = stereo_width(report);
    reasons.push(format!(
        "Width: {:.0}% (measured {:.0}%)",
        width,
        report.stereo.width * 100.0
    ));

    let warmth = genre.warmth();
    reasons.push(format!("Warmth: {:.0}% for {}", warmth, genre));

    let problems = problems(report);
    let confidence = confidence(report, genre_confidence);

    log::info!(
        "Auto master: {} ({}%) -> {} at {} LUFS, confidence {}%",
        genre,
        genre_confidence,
        platform,
        target_lufs,
        confidence
    );
    for problem in &problems {
        log::info!("  {}: {}", problem.issue, problem.fix);
    }

    Decision::Applied(AutoDecision {
        genre,
        genre_confidence,
        platform,
        params: UserParams {
            bass: Some(bass),
            mids: Some(mids),
            highs: Some(highs),
            width: Some(width),
            compression: Some(compression),
            saturation: Some(warmth),
            target_lufs: Some(target_lufs),
        },
        reasons,
        problems,
        confidence,
    })
}

fn detect_genre(report: &AnalysisReport) -> (Genre, u8) {
    let f = &report.frequency_balance.fractions;
    let crest = report.dynamics.crest_factor_db;
    let bass = f.bass + f.sub_bass;
    let mid = f.mid + f.high_mid;
    let high = f.high;

    if bass > 0.35 && mid < 0.3 {
        if crest < 10.0 {
            (Genre::Edm, 95)
        } else {
            (Genre::HipHop, 90)
        }
    } else if mid > 0.45 && bass < 0.25 {
        if crest > 14.0 {
            (Genre::Acoustic, 92)
        } else {
            (Genre::Pop, 85)
        }
    } else if bass > 0.25 && mid > 0.35 && crest > 10.0 {
        (Genre::Rock, 88)
    } else if bass < 0.2 && high > 0.15 {
        (Genre::Electronic, 80)
    } else {
        (Genre::Pop, 75)
    }
}

fn equalization(report: &AnalysisReport, reasons: &mut Vec<String>) -> (f32, f32, f32) {
    let balance = &report.frequency_balance;
    let f = &balance.fractions;

    let bass = if f.bass < 0.15 {
        reasons.push(format!("Bass: +3 dB (weak, {:.0}% energy)", f.bass * 100.0));
        3.0
    } else if f.bass > 0.28 {
        reasons.push(format!("Bass: -2 dB (heavy, {:.0}% energy)", f.bass * 100.0));
        -2.0
    } else {
        reasons.push("Bass: +1 dB (punch)".into());
        1.0
    };

    let mids = if balance.has_issue(BalanceIssue::MuddyLowMids) {
        reasons.push("Mids: -1 dB (muddy low-mids)".into());
        -1.0
    } else if f.mid < 0.2 {
        reasons.push("Mids: +2 dB (weak presence)".into());
        2.0
    } else {
        reasons.push("Mids: 0 dB (balanced)".into());
        0.0
    };

    let highs = if balance.has_issue(BalanceIssue::LacksAir) {
        reasons.push("Highs: +3 dB (lacks air)".into());
        3.0
    } else if balance.has_issue(BalanceIssue::HarshHighs) {
        reasons.push("Highs: -2 dB (harsh)".into());
        -2.0
    } else {
        reasons.push("Highs: +1.5 dB (clarity)".into());
        1.5
    };

    (bass, mids, highs)
}

fn compression_level(genre: Genre, crest_db: f32) -> u8 {
    let base = genre.base_compression();
    if crest_db > 15.0 {
        (base + 2).min(10)
    } else if crest_db < 8.0 {
        base.saturating_sub(3).max(1)
    } else {
        base
    }
}

/// Width percent.
fn stereo_width(report: &AnalysisReport) -> f32 {
    if report.stereo.is_mono {
        return 100.0;
    }
    let measured = report.stereo.width * 100.0;
    if measured < 30.0 {
        120.0
    } else if measured > 80.0 {
        95.0
    } else {
        100.0
    }
}

fn problems(report: &AnalysisReport) -> Vec<Problem> {
    let balance = &report.frequency_balance;
    let mut found = Vec::new();
    if balance.has_issue(BalanceIssue::MuddyLowMids) {
        found.push(Problem {
            issue: "Muddy low-mids".into(),
            fix: "Cut -2.5 dB at 300 Hz",
            severity: Severity::Medium,
        });
    }
    if balance.has_issue(BalanceIssue::HarshHighs) {
        found.push(Problem {
            issue: "Harsh high frequencies".into(),
            fix: "Cut highs by 2 dB",
            severity: Severity::Medium,
        });
    }
    if balance.has_issue(BalanceIssue::LacksAir) {
        found.push(Problem {
            issue: "Lacks high-end air".into(),
            fix: "Boost highs by 3 dB",
            severity: Severity::Low,
        });
    }
    if report.clipping.has_clipping {
        found.push(Problem {
            issue: format!("Clipping detected ({:.2}%)", report.clipping.percentage),
            fix: "Gain reduction and true-peak limiting",
            severity: Severity::High,
        });
    }
    found
}

fn confidence(report: &AnalysisReport, genre_confidence: u8) -> u8 {
    let mut confidence = genre_confidence as i32;
    if report.quality_score < 5.0 {
        confidence -= 20;
    }
    if report.frequency_balance.balance_score < 0.5 {
        confidence -= 15;
    }
    if report.clipping.has_clipping {
        confidence -= 10;
    }
    confidence.max(MIN_CONFIDENCE as i32) as u8
}
