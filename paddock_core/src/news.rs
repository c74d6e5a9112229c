//! Fire-and-forget notifications: league-wide press news and per-team
//! office news.

use crate::qualifying::QualifyingResult;
use paddock_env::{EnvError, TeamId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsKind {
    Pole,
    Winner,
    QualifyingResult,
    RaceResult,
}

/// League-wide announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PressNews {
    pub league_id: String,
    pub title: String,
    pub message: String,
    pub kind: NewsKind,
    pub driver_name: String,
    pub team_name: String,
}

/// Message delivered to a single team's office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeNews {
    pub team_id: TeamId,
    pub title: String,
    pub message: String,
    pub kind: NewsKind,
}

/// Delivery collaborator for notifications.
pub trait Newsroom: Send + Sync {
    fn press(&self, news: PressNews) -> Result<(), EnvError>;

    fn office(&self, news: OfficeNews) -> Result<(), EnvError>;
}

pub fn pole_news(league_id: &str, track_name: &str, pole: &QualifyingResult) -> PressNews {
    PressNews {
        league_id: league_id.to_string(),
        title: format!("POLE POSITION: {}", track_name.to_uppercase()),
        message: format!("{} ({}) takes POLE!", pole.driver_name, pole.team_name),
        kind: NewsKind::Pole,
        driver_name: pole.driver_name.clone(),
        team_name: pole.team_name.clone(),
    }
}

pub fn winner_news(league_id: &str, track_name: &str, driver_name: &str, team_name: &str) -> PressNews {
    PressNews {
        league_id: league_id.to_string(),
        title: format!("RACE WINNER: {}", track_name.to_uppercase()),
        message: format!("{} ({}) wins!", driver_name, team_name),
        kind: NewsKind::Winner,
        driver_name: driver_name.to_string(),
        team_name: team_name.to_string(),
    }
}

/// One line per driver of the team, in grid order.
pub fn qualifying_report(team_id: &TeamId, rows: &[&QualifyingResult]) -> OfficeNews {
    let message = rows
        .iter()
        .map(|row| {
            if row.crashed {
                format!("{}: DNF (Crash)", row.driver_name)
            } else {
                format!("{}: P{}", row.driver_name, row.position)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    OfficeNews {
        team_id: team_id.clone(),
        title: "Qualifying Results".to_string(),
        message,
        kind: NewsKind::QualifyingResult,
    }
}

/// A driver's line in a team's race report.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceReportLine {
    pub driver_name: String,
    /// `None` for a DNF
    pub position: Option<usize>,
    pub points: u32,
}

pub fn race_report(team_id: &TeamId, track_name: &str, lines: &[RaceReportLine], prize: u64) -> OfficeNews {
    let mut message: Vec<String> = lines
        .iter()
        .map(|line| match line.position {
            Some(pos) => format!("{}: P{} (+{} pts)", line.driver_name, pos, line.points),
            None => format!("{}: DNF (+0 pts)", line.driver_name),
        })
        .collect();
    message.push(format!("Prize: ${}", format_money(prize)));

    OfficeNews {
        team_id: team_id.clone(),
        title: format!("Race Results: {}", track_name),
        message: message.join("\n"),
        kind: NewsKind::RaceResult,
    }
}

/// Formats an amount with comma thousands separators.
pub fn format_money(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
