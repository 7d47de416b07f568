//! Alert decision and notification policy

use crate::config::{NotifyMode, Thresholds};

/// Outcome of the alert decision for one cycle.
///
/// Exactly one category applies per cycle; the high-CO2 check wins over the
/// raw gas check even when both thresholds are exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCategory {
    HighCo2,
    PoorAirQuality,
    Normal,
}

impl AlertCategory {
    pub fn decide(gas_raw: u16, co2_ppm: f32, thresholds: &Thresholds) -> Self {
        if co2_ppm > thresholds.co2_ppm {
            Self::HighCo2
        } else if gas_raw > thresholds.gas_raw {
            Self::PoorAirQuality
        } else {
            Self::Normal
        }
    }

    /// Whether the buzzer should sound for this category
    pub const fn is_alarm(self) -> bool {
        !matches!(self, Self::Normal)
    }

    /// Dashboard event raised for this category, if any
    pub const fn event(self) -> Option<AlertEvent> {
        match self {
            Self::HighCo2 => Some(AlertEvent::HighCo2),
            Self::PoorAirQuality => Some(AlertEvent::PoorAirQuality),
            Self::Normal => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::HighCo2 => "High CO2",
            Self::PoorAirQuality => "Poor air quality",
            Self::Normal => "Normal",
        }
    }
}

/// Named dashboard event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEvent {
    HighCo2,
    PoorAirQuality,
}

impl AlertEvent {
    /// Event code configured on the dashboard
    pub const fn code(self) -> &'static str {
        match self {
            Self::HighCo2 => "high_co2",
            Self::PoorAirQuality => "poor_air_quality",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::HighCo2 => "ALERT! High CO2 levels!",
            Self::PoorAirQuality => "ALERT! Bad air detected!",
        }
    }
}

/// Decides whether an alarm category should produce a dashboard event
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    mode: NotifyMode,
    last: AlertCategory,
}

impl AlertNotifier {
    pub const fn new(mode: NotifyMode) -> Self {
        Self {
            mode,
            last: AlertCategory::Normal,
        }
    }

    /// Record this cycle's category and return the event to send, if any.
    pub fn observe(&mut self, category: AlertCategory) -> Option<AlertEvent> {
        let changed = category != self.last;
        self.last = category;

        match self.mode {
            NotifyMode::EveryCycle => category.event(),
            NotifyMode::OnTransition if changed => category.event(),
            NotifyMode::OnTransition => None,
        }
    }
}
