#![allow(dead_code)]

use canteen::application::canteen::Canteen;
use canteen::auth::{Identity, InMemoryTokenValidator};
use canteen::domain::ports::StorageEngineBox;
use canteen::infrastructure::in_memory::InMemoryStorage;
use canteen::interfaces::seed::SeedData;
use std::sync::Arc;

pub const ADMIN: u64 = 1;
pub const BUDI: u64 = 2;
pub const SITI: u64 = 3;
pub const WARUNG_A: u64 = 10;
pub const WARUNG_B: u64 = 20;

pub const NASI_GORENG: u64 = 1;
pub const ES_TEH: u64 = 2;
pub const BAKSO: u64 = 3;
pub const MIE_AYAM: u64 = 4;

/// Two students, one admin, and two stands. Warung A has a QRIS code,
/// Warung B does not. Bakso is down to its last portion.
pub const SEED: &str = r#"
users:
  - { id: 1, name: Admin, role: admin }
  - { id: 2, name: Budi, role: student }
  - { id: 3, name: Siti, role: student }
  - { id: 10, name: Warung A, role: stand_admin }
  - { id: 20, name: Warung B, role: stand_admin }
stands:
  - { stand_id: 10, store_name: Warung A, qris: QRIS-WARUNG-A }
  - { stand_id: 20, store_name: Warung B }
products:
  - { id: 1, name: Nasi Goreng, price: 10000, discount: 10, stock: 20, stand_id: 10 }
  - { id: 2, name: Es Teh, price: 3000, stock: 50, stand_id: 10 }
  - { id: 3, name: Bakso, price: 12000, stock: 1, stand_id: 20 }
  - { id: 4, name: Mie Ayam, price: 1500, stock: 10, stand_id: 10 }
"#;

pub async fn seeded(engine: StorageEngineBox) -> Canteen {
    let canteen = Canteen::new(engine, Arc::new(InMemoryTokenValidator::new()));
    SeedData::from_yaml(SEED)
        .unwrap()
        .apply(&canteen)
        .await
        .unwrap();
    canteen
}

pub async fn canteen() -> Canteen {
    seeded(Box::new(InMemoryStorage::new())).await
}

pub fn admin() -> Identity {
    Identity::admin(ADMIN)
}

pub fn budi() -> Identity {
    Identity::student(BUDI)
}

pub fn siti() -> Identity {
    Identity::student(SITI)
}

pub fn warung_a() -> Identity {
    Identity::stand(WARUNG_A)
}
