//! Merchant Definition Structures
//!
//! Defines data structures for merchant definitions as loaded from TOML.

use serde::Deserialize;

use super::job::MerchantJob;
use crate::world::Direction;

/// An item a vending merchant stocks, with quantity and restock configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VendItem {
    pub name: String,
    pub quantity: u32,
    /// Minutes between restocks
    #[serde(default)]
    pub restock: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VendRole {
    #[serde(default)]
    pub items: Vec<VendItem>,
}

/// A skill or spell a trainer teaches
#[derive(Debug, Clone, Deserialize)]
pub struct CastableOffer {
    pub name: String,
    #[serde(default)]
    pub icon: u8,
    #[serde(default)]
    pub color: u8,
    #[serde(default)]
    pub price: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainRole {
    #[serde(default)]
    pub skills: Vec<CastableOffer>,
    #[serde(default)]
    pub spells: Vec<CastableOffer>,
}

/// Roles that only need to be present, e.g. `[Name.roles.bank]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarkerRole {}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleList {
    pub vend: Option<VendRole>,
    pub train: Option<TrainRole>,
    pub bank: Option<MarkerRole>,
    pub repair: Option<MarkerRole>,
    pub post: Option<MarkerRole>,
}

impl RoleList {
    /// Capabilities granted by the configured roles
    pub fn capabilities(&self) -> MerchantJob {
        let mut jobs = MerchantJob::empty();
        if self.vend.is_some() {
            jobs.insert(MerchantJob::VEND);
        }
        if let Some(train) = &self.train {
            if !train.skills.is_empty() {
                jobs.insert(MerchantJob::SKILLS);
            }
            if !train.spells.is_empty() {
                jobs.insert(MerchantJob::SPELLS);
            }
        }
        if self.bank.is_some() {
            jobs.insert(MerchantJob::BANK);
        }
        if self.repair.is_some() {
            jobs.insert(MerchantJob::REPAIR);
        }
        if self.post.is_some() {
            jobs.insert(MerchantJob::POST);
        }
        jobs
    }

    pub fn skills(&self) -> &[CastableOffer] {
        self.train.as_ref().map(|t| t.skills.as_slice()).unwrap_or_default()
    }

    pub fn spells(&self) -> &[CastableOffer] {
        self.train.as_ref().map(|t| t.spells.as_slice()).unwrap_or_default()
    }
}

/// Raw merchant as loaded directly from TOML, keyed by name
#[derive(Debug, Clone, Deserialize)]
pub struct RawMerchantDefinition {
    #[serde(default)]
    pub sprite: u16,
    #[serde(default)]
    pub x: u16,
    #[serde(default)]
    pub y: u16,
    #[serde(default)]
    pub direction: Direction,
    /// Job bitmask as names. Defaults to the capabilities of `roles`.
    pub jobs: Option<Vec<String>>,
    #[serde(default)]
    pub roles: RoleList,
}

#[derive(Debug, Clone)]
pub struct MerchantDefinition {
    pub name: String,
    pub sprite: u16,
    pub x: u16,
    pub y: u16,
    pub direction: Direction,
    pub jobs: MerchantJob,
    pub roles: RoleList,
}

impl MerchantDefinition {
    pub fn from_raw(name: &str, raw: RawMerchantDefinition) -> Result<Self, String> {
        let jobs = match &raw.jobs {
            Some(names) => {
                let mut jobs = MerchantJob::empty();
                for job in names {
                    let flag = MerchantJob::from_name(job)
                        .ok_or_else(|| format!("Merchant '{}' has unknown job '{}'", name, job))?;
                    jobs.insert(flag);
                }
                jobs
            }
            None => raw.roles.capabilities(),
        };

        Ok(Self {
            name: name.to_string(),
            sprite: raw.sprite,
            x: raw.x,
            y: raw.y,
            direction: raw.direction,
            jobs,
            roles: raw.roles,
        })
    }

    /// A bare definition at the origin with no roles
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sprite: 0,
            x: 0,
            y: 0,
            direction: Direction::South,
            jobs: MerchantJob::empty(),
            roles: RoleList::default(),
        }
    }

    pub fn with_vend_items(mut self, items: Vec<VendItem>) -> Self {
        self.roles.vend = Some(VendRole { items });
        self.jobs.insert(MerchantJob::VEND);
        self
    }

    pub fn with_jobs(mut self, jobs: MerchantJob) -> Self {
        self.jobs = jobs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jobs_default_to_role_capabilities() {
        let raw: RawMerchantDefinition = toml::from_str(
            r#"
sprite = 12
[roles.vend]
items = [{ name = "Apple", quantity = 10, restock = 60 }]
[roles.train]
skills = [{ name = "Assail", icon = 1 }]
[roles.bank]
"#,
        )
        .unwrap();

        let def = MerchantDefinition::from_raw("Riona", raw).unwrap();
        assert_eq!(def.jobs, MerchantJob::VEND | MerchantJob::SKILLS | MerchantJob::BANK);
        assert_eq!(def.roles.capabilities(), def.jobs);
        assert_eq!(def.direction, Direction::South);
    }

    #[test]
    fn test_explicit_jobs_can_diverge() {
        let raw: RawMerchantDefinition = toml::from_str(
            r#"
jobs = ["bank"]
[roles.vend]
items = [{ name = "Apple", quantity = 1 }]
"#,
        )
        .unwrap();

        let def = MerchantDefinition::from_raw("Aingeal", raw).unwrap();
        assert_eq!(def.jobs, MerchantJob::BANK);
        assert!(def.roles.capabilities().contains(MerchantJob::VEND));
    }

    #[test]
    fn test_unknown_job_name_is_rejected() {
        let raw: RawMerchantDefinition = toml::from_str(r#"jobs = ["tailor"]"#).unwrap();
        assert!(MerchantDefinition::from_raw("Odran", raw).is_err());
    }
}
