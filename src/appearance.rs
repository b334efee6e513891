use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

static APPEARANCE: OnceLock<NavigationAppearance> = OnceLock::new();

/// Navigation bar styling, fixed once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationAppearance {
    pub title: String,
    pub opaque_background: bool,
    pub background_color: String,
    pub title_color: String,
    pub large_title_color: String,
}

impl Default for NavigationAppearance {
    fn default() -> Self {
        Self {
            title: "Plisn2024".to_string(),
            opaque_background: true,
            background_color: "#0000FF".to_string(),
            title_color: "#FFFFFF".to_string(),
            large_title_color: "#FFFFFF".to_string(),
        }
    }
}

impl NavigationAppearance {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("appearance.title", "Title cannot be empty"));
        }

        InputValidator::validate_hex_color("appearance.background_color", &self.background_color)?;
        InputValidator::validate_hex_color("appearance.title_color", &self.title_color)?;
        InputValidator::validate_hex_color(
            "appearance.large_title_color",
            &self.large_title_color,
        )?;

        Ok(())
    }

    pub fn background_rgb(&self) -> AppResult<[u8; 3]> {
        parse_rgb(&self.background_color)
    }

    pub fn title_rgb(&self) -> AppResult<[u8; 3]> {
        parse_rgb(&self.title_color)
    }
}

fn parse_rgb(color: &str) -> AppResult<[u8; 3]> {
    InputValidator::validate_hex_color("color", color)?;

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&color[range], 16)
            .map_err(|e| AppError::validation("color", &e.to_string()))
    };

    Ok([channel(1..3)?, channel(3..5)?, channel(5..7)?])
}

/// Install the appearance for the rest of the process. Only the first call
/// wins; later calls fail instead of restyling a running app.
pub fn install(appearance: NavigationAppearance) -> AppResult<&'static NavigationAppearance> {
    appearance.validate()?;

    APPEARANCE
        .set(appearance)
        .map_err(|_| AppError::AppearanceAlreadyInstalled)?;

    let installed = current()
        .ok_or_else(|| AppError::Internal("Appearance missing after install".to_string()))?;
    log::info!(
        "Navigation appearance installed: '{}' on {}",
        installed.title,
        installed.background_color
    );
    Ok(installed)
}

pub fn current() -> Option<&'static NavigationAppearance> {
    APPEARANCE.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_blue_with_white_titles() {
        let appearance = NavigationAppearance::default();
        assert!(appearance.validate().is_ok());
        assert_eq!(appearance.background_rgb().unwrap(), [0, 0, 255]);
        assert_eq!(appearance.title_rgb().unwrap(), [255, 255, 255]);
    }

    #[test]
    fn test_validate_rejects_bad_colors() {
        let appearance = NavigationAppearance {
            title_color: "white".to_string(),
            ..NavigationAppearance::default()
        };
        assert!(matches!(
            appearance.validate(),
            Err(AppError::Validation { .. })
        ));
    }

    // The only test in this binary that touches the global.
    #[test]
    fn test_install_happens_once() {
        let installed = install(NavigationAppearance::default()).unwrap();
        assert_eq!(installed.title, "Plisn2024");
        assert_eq!(current(), Some(installed));

        let restyle = NavigationAppearance {
            background_color: "#FF0000".to_string(),
            ..NavigationAppearance::default()
        };
        assert!(matches!(
            install(restyle),
            Err(AppError::AppearanceAlreadyInstalled)
        ));
        assert_eq!(current().unwrap().background_color, "#0000FF");
    }
}
