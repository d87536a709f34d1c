// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation for output systems and their cards.
//!
//! Every check runs and every failure is collected, so one pass over a broken
//! configuration file reports all of its problems:
//!
//! 1. At least one output system is configured
//! 2. Output system names are unique
//! 3. Card names are unique across all output systems, so channel ownership is disjoint
//! 4. Every card provides at least one channel
//! 5. Sample rates, where given, are positive, finite and at most `MAX_SAMPLE_RATE`
//!
//! # Examples
//!
//! ```rust
//! use the_sequencer::config::{parse_config, validate_config};
//! use the_sequencer::document::Format;
//!
//! let yaml = r#"
//! sequence: sequence.yaml
//! output_systems:
//!   - name: dummy
//!     type: dummy
//!     cards:
//!       - { name: dio0, kind: digital, channels: [shutter] }
//! "#;
//! let config = parse_config(yaml, Format::Yaml).unwrap();
//! assert!(validate_config(&config).is_ok());
//! ```

use std::collections::HashSet;

use crate::config::consts::MAX_SAMPLE_RATE;
use crate::config::Config;
use crate::errors::ConfigurationError;

pub fn validate_config(cfg: &Config) -> Result<(), Vec<ConfigurationError>> {
    let mut errors = Vec::new();

    if cfg.output_systems.is_empty() {
        errors.push(ConfigurationError::NoOutputSystems);
    }

    let mut systems = HashSet::new();
    let mut cards = HashSet::new();
    for system in &cfg.output_systems {
        if !systems.insert(system.name.as_str()) {
            errors.push(ConfigurationError::DuplicateOutputSystem {
                name: system.name.clone(),
            });
        }

        for card in &system.cards {
            if !cards.insert(card.name.as_str()) {
                errors.push(ConfigurationError::DuplicateCard {
                    name: card.name.clone(),
                });
            }
            if card.channels.is_empty() {
                errors.push(ConfigurationError::EmptyCard {
                    name: card.name.clone(),
                });
            }
            if let Some(rate) = card.sample_rate {
                if !(rate.is_finite() && rate > 0.0 && rate <= MAX_SAMPLE_RATE) {
                    errors.push(ConfigurationError::InvalidSampleRate {
                        card: card.name.clone(),
                        sample_rate: rate,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendType, CardConfig, OutputSystemConfig};
    use crate::sequence::CardKind;

    fn card(name: &str, channels: &[&str]) -> CardConfig {
        CardConfig {
            name: name.to_string(),
            kind: CardKind::Digital,
            address: None,
            sample_rate: None,
            channels: channels.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn system(name: &str, cards: Vec<CardConfig>) -> OutputSystemConfig {
        OutputSystemConfig {
            name: name.to_string(),
            backend: BackendType::Dummy,
            completion_delay_ms: None,
            cards,
        }
    }

    fn config(output_systems: Vec<OutputSystemConfig>) -> Config {
        Config {
            sequence: "sequence.yaml".into(),
            scheduler: Default::default(),
            storage: Default::default(),
            notifications: Default::default(),
            output_systems,
        }
    }

    #[test]
    fn test_valid_config() {
        let cfg = config(vec![
            system("a", vec![card("dio0", &["x"])]),
            system("b", vec![card("dio1", &["y", "z"])]),
        ]);
        assert!(validate_config(&cfg).is_ok());
    }

    #[test]
    fn test_no_output_systems() {
        let errors = validate_config(&config(vec![])).unwrap_err();
        assert_eq!(errors, vec![ConfigurationError::NoOutputSystems]);
    }

    #[test]
    fn test_card_names_are_unique_across_systems() {
        let cfg = config(vec![
            system("a", vec![card("dio0", &["x"])]),
            system("b", vec![card("dio0", &["y"])]),
        ]);
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigurationError::DuplicateCard {
                name: "dio0".into()
            }]
        );
    }

    #[test]
    fn test_sample_rate_must_be_positive() {
        let mut analog = card("ao0", &["coil"]);
        analog.kind = CardKind::Analog;
        analog.sample_rate = Some(f64::NAN);
        let errors = validate_config(&config(vec![system("a", vec![analog])])).unwrap_err();
        assert!(matches!(
            errors[0],
            ConfigurationError::InvalidSampleRate { .. }
        ));
    }

    #[test]
    fn test_sample_rate_has_an_upper_bound() {
        let mut analog = card("ao0", &["coil"]);
        analog.kind = CardKind::Analog;
        analog.sample_rate = Some(MAX_SAMPLE_RATE * 10.0);
        let errors = validate_config(&config(vec![system("a", vec![analog])])).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigurationError::InvalidSampleRate {
                card: "ao0".into(),
                sample_rate: MAX_SAMPLE_RATE * 10.0,
            }]
        );
    }
}
