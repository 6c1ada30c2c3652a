use crate::application::canteen::Canteen;
use crate::domain::product::Product;
use crate::domain::stand::StandSettings;
use crate::domain::user::User;
use crate::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Initial catalog loaded from YAML.
///
/// ```yaml
/// users:
///   - { id: 1, name: Admin, role: admin }
///   - { id: 2, name: Budi, role: student, balance: 10000 }
///   - { id: 10, name: Warung A, role: stand_admin }
/// stands:
///   - { stand_id: 10, store_name: Warung A, qris: QRIS-WARUNG-A }
/// products:
///   - { id: 1, name: Nasi Goreng, price: 10000, discount: 10, stock: 20, stand_id: 10 }
/// ```
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct SeedData {
    pub users: Vec<User>,
    pub stands: Vec<StandSettings>,
    pub products: Vec<Product>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub stands: usize,
    pub products: usize,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Inserts every row that does not exist yet. Existing rows are left
    /// untouched, so seeding a persistent store twice is safe.
    pub async fn apply(&self, canteen: &Canteen) -> Result<SeedReport> {
        let mut report = SeedReport::default();
        for user in &self.users {
            report.users += usize::from(canteen.seed_user(user).await?);
        }
        for stand in &self.stands {
            report.stands += usize::from(canteen.seed_stand(stand).await?);
        }
        for product in &self.products {
            report.products += usize::from(canteen.seed_product(product).await?);
        }
        info!(
            users = report.users,
            stands = report.stands,
            products = report.products,
            "seed data applied"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryTokenValidator, Role};
    use crate::infrastructure::in_memory::InMemoryStorage;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const SEED: &str = r#"
users:
  - { id: 1, name: Admin, role: admin }
  - { id: 2, name: Budi, role: student, balance: 10000 }
  - { id: 10, name: Warung A, role: stand_admin }
stands:
  - { stand_id: 10, store_name: Warung A, qris: QRIS-WARUNG-A }
products:
  - { id: 1, name: Nasi Goreng, price: 10000, discount: 10, stock: 20, stand_id: 10 }
"#;

    #[test]
    fn test_parse_seed() {
        let seed = SeedData::from_yaml(SEED).unwrap();
        assert_eq!(seed.users.len(), 3);
        assert_eq!(seed.users[1].role, Role::Student);
        assert_eq!(seed.users[1].balance.0, dec!(10000));
        assert!(seed.users[0].is_active);
        assert_eq!(seed.products[0].unit_price(), dec!(9000));
        assert_eq!(seed.stands[0].qris.as_deref(), Some("QRIS-WARUNG-A"));
    }

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let canteen = Canteen::new(
            Box::new(InMemoryStorage::new()),
            Arc::new(InMemoryTokenValidator::new()),
        );
        let seed = SeedData::from_yaml(SEED).unwrap();

        let first = seed.apply(&canteen).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                users: 3,
                stands: 1,
                products: 1
            }
        );
        let second = seed.apply(&canteen).await.unwrap();
        assert_eq!(second, SeedReport::default());
    }
}
