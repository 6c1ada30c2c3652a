mod common;

use canteen::auth::Identity;
use canteen::error::CanteenError;
use common::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_last_unit_of_stock_sells_once() {
    let canteen = Arc::new(canteen().await);
    for user in [budi(), siti()] {
        canteen.add_to_cart(&user, BAKSO, 1).await.unwrap();
    }

    let handles: Vec<_> = [budi(), siti()]
        .into_iter()
        .map(|user| {
            let canteen = Arc::clone(&canteen);
            tokio::spawn(async move { canteen.checkout(&user, "cash", Some(dec!(12000))).await })
        })
        .collect();

    let mut sold = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(CanteenError::InsufficientStock(name)) => {
                assert_eq!(name, "Bakso");
                out_of_stock += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(sold, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(canteen.get_product(BAKSO).await.unwrap().stock, 0);
    assert_eq!(
        canteen
            .list_orders_for_stand(&Identity::stand(WARUNG_B))
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_top_ups_all_land() {
    let canteen = Arc::new(canteen().await);

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let canteen = Arc::clone(&canteen);
            tokio::spawn(async move { canteen.top_up_balance(&admin(), BUDI, dec!(500)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(canteen.get_balance(&budi()).await.unwrap().0, dec!(10000));
    let history = canteen.list_transactions(&budi()).await.unwrap();
    assert_eq!(history.len(), 20);
    for pair in history.windows(2) {
        assert_eq!(pair[0].balance_after, pair[1].balance_before);
    }
}
