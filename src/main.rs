use maeson_realty::listings::{PropertyCard, Showcase, ShowcaseTab};
use maeson_realty::search::SearchParams;
use maeson_realty::{BackendConfig, Marketplace};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🏠 Maeson Realty - listing search");

    let config = BackendConfig::from_env();
    if config.is_placeholder() {
        warn!("Using placeholder backend settings; requests will fail");
    }
    let market = Marketplace::connect(config)?;

    // Optional query string in the listing-page URL format
    let query = std::env::args().nth(1).unwrap_or_default();
    let params = SearchParams::from_query_string(&query);
    info!("Searching with {:?}", params);

    let page = market.properties.list(&params.into_filters()).await?;
    info!(
        "✅ Page {}/{}: {} of {} properties",
        page.page, page.pages, page.count, page.total
    );

    for (i, property) in page.data.iter().enumerate() {
        let card = PropertyCard::from_property(property);
        println!("{}. {} ({})", i + 1, card.title, card.price);
        println!("   {} · {}", card.location, card.kind.as_str());
        println!("   {} bed, {} bath {}", card.bedrooms, card.bathrooms, card.area);
        if let Some(image) = &card.image {
            println!("   Image: {}", image);
        }
        println!("   ID: {}", card.id);
        println!();
    }

    let featured = market.properties.featured().await?;
    let showcase = Showcase::from_featured(&featured);
    info!(
        "Featured: {} for sale, {} for rent",
        showcase.sale.len(),
        showcase.rent.len()
    );
    for tab in [ShowcaseTab::Buy, ShowcaseTab::Rent] {
        for card in showcase.visible(tab, maeson_realty::listings::cards::SHOWCASE_STEP) {
            println!("★ {} ({}) - {}", card.title, card.location, card.price);
        }
    }

    println!("{}", serde_json::to_string_pretty(&page)?);

    Ok(())
}
