//! AI rule profiles loaded from TOML
//!
//! A profile is an ordered list of condition -> action rules. The rule
//! engine commits the first rule whose conditions hold and whose action
//! can be performed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::battle::effects::EffectType;
use crate::core::error::Result;

/// Who a condition or action refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    #[serde(rename = "self")]
    SelfUnit,
    #[default]
    RandomOpponent,
    ClosestOpponent,
    RandomAlly,
    ClosestAlly,
    BarrierBlockingClosestOpponent,
    EmptyGroundNearSelf,
}

/// A rule precondition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Own health below this percentage
    HealthBelow { value: f64 },
    /// Path length to the target at least `value`
    DistanceHigherThan {
        value: u32,
        #[serde(default)]
        target: RuleTarget,
    },
    /// Path length to the target at most `value`
    DistanceLowerThan {
        value: u32,
        #[serde(default)]
        target: RuleTarget,
    },
    SpecificRound { value: u32 },
    NoActiveSummon,
}

fn default_effect() -> EffectType {
    EffectType::Damage
}

/// What a rule does once its conditions hold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    MoveTowardsOpponent {
        #[serde(default)]
        target: RuleTarget,
    },
    EndTurn,
    UseSpecificAction {
        action_id: String,
        #[serde(default)]
        target: RuleTarget,
    },
    UseRandomJutsu {
        #[serde(default)]
        target: RuleTarget,
    },
    UseRandomItem {
        #[serde(default)]
        target: RuleTarget,
    },
    UseHighestPowerAction {
        #[serde(default = "default_effect")]
        effect: EffectType,
        #[serde(default)]
        target: RuleTarget,
    },
    UseHighestPowerJutsu {
        #[serde(default = "default_effect")]
        effect: EffectType,
        #[serde(default)]
        target: RuleTarget,
    },
    UseHighestPowerItem {
        #[serde(default = "default_effect")]
        effect: EffectType,
        #[serde(default)]
        target: RuleTarget,
    },
    /// Cycle through a fixed sequence of jutsus and items
    UseComboAction {
        combo_ids: Vec<String>,
        #[serde(default)]
        target: RuleTarget,
    },
}

impl RuleAction {
    pub fn target(&self) -> Option<RuleTarget> {
        match self {
            RuleAction::EndTurn => None,
            RuleAction::MoveTowardsOpponent { target }
            | RuleAction::UseSpecificAction { target, .. }
            | RuleAction::UseRandomJutsu { target }
            | RuleAction::UseRandomItem { target }
            | RuleAction::UseHighestPowerAction { target, .. }
            | RuleAction::UseHighestPowerJutsu { target, .. }
            | RuleAction::UseHighestPowerItem { target, .. }
            | RuleAction::UseComboAction { target, .. } => Some(*target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub action: RuleAction,
}

impl Rule {
    pub fn new(conditions: Vec<Condition>, action: RuleAction) -> Self {
        Self { conditions, action }
    }
}

/// Complete rule profile of one AI unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Name of this profile (set from filename when loaded by name)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Append [`default_rules`] after the authored rules
    #[serde(default)]
    pub include_default_rules: bool,
}

impl AiProfile {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Rules in evaluation order for a unit
    pub fn rules_for(&self, with_defaults: bool) -> Vec<Rule> {
        let mut rules = self.rules.clone();
        if with_defaults || self.include_default_rules {
            rules.extend(default_rules());
        }
        rules
    }
}

/// Fallback tail: close in, hit the closest thing in reach, then break
/// through a barrier in the way
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            vec![Condition::DistanceHigherThan {
                value: 2,
                target: RuleTarget::RandomOpponent,
            }],
            RuleAction::MoveTowardsOpponent {
                target: RuleTarget::RandomOpponent,
            },
        ),
        Rule::new(
            vec![Condition::DistanceLowerThan {
                value: 2,
                target: RuleTarget::RandomOpponent,
            }],
            RuleAction::UseHighestPowerAction {
                effect: EffectType::Damage,
                target: RuleTarget::RandomOpponent,
            },
        ),
        Rule::new(
            Vec::new(),
            RuleAction::UseHighestPowerAction {
                effect: EffectType::Damage,
                target: RuleTarget::BarrierBlockingClosestOpponent,
            },
        ),
    ]
}

/// Load a profile from a TOML file
pub fn load_profile(path: impl AsRef<Path>) -> Result<AiProfile> {
    let contents = fs::read_to_string(path.as_ref())?;
    AiProfile::from_toml_str(&contents)
}

/// Load `data/ai_profiles/{name}.toml`
pub fn load_named_profile(name: &str) -> Result<AiProfile> {
    let mut profile = load_profile(profile_path(name))?;
    profile.name = name.to_string();
    Ok(profile)
}

fn profile_path(name: &str) -> PathBuf {
    PathBuf::from("data/ai_profiles").join(format!("{}.toml", name))
}
