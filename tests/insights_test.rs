//! Insight aggregation behavior: rule checks, ranking and bounding,
//! atomic regeneration, and the always-complete dashboard.

mod common;

use std::collections::HashSet;

use shoplytics::models::{InsightKind, InsightPriority};

fn kinds(insights: &[shoplytics::models::StoredInsight]) -> HashSet<&'static str> {
    insights.iter().map(|s| s.insight.kind.key()).collect()
}

#[tokio::test]
async fn empty_shop_still_gets_a_complete_result_set() {
    let shop = common::test_shop();

    let insights = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    // the forecast outlook always materializes, even from the default path
    assert!(kinds(&insights).contains("sales_forecast"));
    for stored in &insights {
        assert!(stored.is_active);
        assert!(!stored.is_read);
        assert!(stored.insight.confidence <= 100);
    }

    let report = shop.engine.insights().dashboard(shop.shop_id).await.unwrap();
    assert_eq!(report.forecast.len(), 7);
    assert!(report.stockouts.is_empty());
    assert!(report.price_recommendations.is_empty());
    assert!(report.segments.is_empty());
}

#[tokio::test]
async fn rule_checks_fire_on_a_busy_shop() {
    let shop = common::test_shop();

    // steady sales with named repeat customers and big baskets
    for days_ago in 1..=30 {
        shop.bill(days_ago, 900, Some("Farah"));
        shop.bill(days_ago, 800, Some("Gita"));
    }

    let depleted = shop.product("Nearly Gone Gum", 2, Some(50), 100);
    let overstocked = shop.product("Forgotten Fans", 80, Some(200), 400);
    let thin = shop.product("Thin Margin Tea", 40, Some(95), 100);
    let plump = shop.product("Plump Margin Pots", 40, Some(10), 100);
    for days_ago in 1..=30 {
        shop.sale(&depleted, days_ago, 2, 100);
        shop.sale(&thin, days_ago, 1, 100);
    }
    let _ = (&overstocked, &plump); // never sold

    let insights = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    let seen = kinds(&insights);
    assert!(seen.contains("low_stock"));
    assert!(seen.contains("overstock"));
    assert!(seen.contains("low_margin"));
    assert!(seen.contains("high_margin"));
    assert!(seen.contains("high_customer_value"));
    assert!(seen.contains("customer_loyalty"));
    assert!(seen.contains("top_product"));
    assert!(seen.contains("stockout_risk"));

    // ranked: priorities never increase down the list
    for pair in insights.windows(2) {
        assert!(pair[0].insight.priority >= pair[1].insight.priority);
    }
    let critical = insights
        .iter()
        .find(|s| s.insight.kind.key() == "low_stock")
        .unwrap();
    assert_eq!(critical.insight.priority, InsightPriority::Critical);
}

#[tokio::test]
async fn product_lists_are_bounded_inside_one_message() {
    let shop = common::test_shop();
    for i in 0..6 {
        shop.product(&format!("Scarce Item {}", i), 1, Some(50), 100);
    }

    let insights = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    let low_stock: Vec<_> = insights
        .iter()
        .filter(|s| s.insight.kind.key() == "low_stock")
        .collect();

    // one aggregated insight, not one per product
    assert_eq!(low_stock.len(), 1);
    let InsightKind::LowStock { product_names, count } = &low_stock[0].insight.kind else {
        panic!("expected a low stock kind");
    };
    assert_eq!(*count, 6);
    assert_eq!(product_names.len(), 6);
    assert!(low_stock[0].insight.message.ends_with("..."));
    assert_eq!(low_stock[0].insight.message.matches(',').count(), 2);
}

#[tokio::test]
async fn sales_decline_outranks_growth_rules() {
    let shop = common::test_shop();
    // strong month, dead week: a decline alert
    for days_ago in 8..=30 {
        shop.bill(days_ago, 1500, None);
    }
    for days_ago in 1..=7 {
        shop.bill(days_ago, 200, None);
    }

    let insights = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    let seen = kinds(&insights);
    assert!(seen.contains("sales_decline"));
    assert!(!seen.contains("sales_growth"));
    assert_eq!(
        insights[0].insight.priority,
        InsightPriority::Critical,
        "decline alert should rank first"
    );
}

#[tokio::test]
async fn mark_read_flips_one_stored_insight() {
    let shop = common::test_shop();
    shop.product("Scarce Thing", 1, Some(10), 30);

    let insights = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    let target = insights.first().unwrap().id;

    assert!(shop.engine.insights().mark_read(target).await.unwrap());
    let listed = shop.engine.insights().list(shop.shop_id).await.unwrap();
    let read: Vec<_> = listed.iter().filter(|s| s.is_read).collect();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, target);
}

#[tokio::test]
async fn readers_never_observe_an_empty_list_mid_regeneration() {
    let shop = common::test_shop();
    shop.product("Scarce Thing", 1, Some(10), 30);
    shop.constant_daily_history(20, 600);

    // settle an initial non-empty set
    let initial = shop.engine.insights().regenerate(shop.shop_id).await.unwrap();
    assert!(!initial.is_empty());

    let insights = shop.engine.insights();
    let reader_insights = insights.clone();
    let shop_id = shop.shop_id;

    let reader = tokio::spawn(async move {
        for _ in 0..200 {
            let listed = reader_insights.list(shop_id).await.unwrap();
            assert!(!listed.is_empty(), "observed cleared insights mid-regeneration");
            tokio::task::yield_now().await;
        }
    });

    for _ in 0..5 {
        insights.regenerate(shop_id).await.unwrap();
    }
    reader.await.unwrap();
}
