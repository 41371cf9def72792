// CLI Command Implementations
// Handles execution of each CLI command with colored output

use super::{error, info, price, success, warning, ConfigAction, StoreCommand};
use anyhow::Context;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use storefront_sync::{
    CartSnapshot, Credentials, ProductQuery, Registration, StoreError, Storefront, StorefrontConfig,
};

/// Execute a command against the storefront API
pub async fn execute(command: StoreCommand, config: StorefrontConfig) -> anyhow::Result<()> {
    let store = Storefront::connect(config)
        .await
        .context("Failed to initialise storefront client")?;

    let is_login = matches!(command, StoreCommand::Login { .. });
    let result = match command {
        StoreCommand::Login { username, password } => login_command(&store, username, password).await,
        StoreCommand::Logout => logout_command(&store).await,
        StoreCommand::Register { username, password, email } => {
            register_command(&store, username, password, email).await
        }
        StoreCommand::Whoami => whoami_command(&store).await,
        StoreCommand::Balance => balance_command(&store).await,
        StoreCommand::Recharge { amount } => recharge_command(&store, amount).await,
        StoreCommand::Products { page, size, sort, category } => {
            products_command(&store, page, size, sort, category).await
        }
        StoreCommand::Product { id } => product_command(&store, id).await,
        StoreCommand::Stock { id } => stock_command(&store, id).await,
        StoreCommand::Cart => cart_command(&store).await,
        StoreCommand::Add { product_id, quantity } => add_command(&store, product_id, quantity).await,
        StoreCommand::Update { product_id, quantity } => {
            update_command(&store, product_id, quantity).await
        }
        StoreCommand::Remove { product_id } => remove_command(&store, product_id).await,
        StoreCommand::Clear => clear_command(&store).await,
        StoreCommand::Checkout => checkout_command(&store).await,
    };

    if store.session().login_required() && !is_login {
        warning("Your session has expired. Run `storefront login` to sign in again.");
    }

    result
}

/// Run a future behind a spinner
async fn with_spinner<T, F>(message: &str, fut: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));

    let out = fut.await;
    spinner.finish_and_clear();
    out
}

/// Turn a library error into the text shown to the user
fn report(err: StoreError) -> anyhow::Error {
    match &err {
        StoreError::NotAuthenticated => error("Please log in first: storefront login -u <name> -p <password>"),
        StoreError::Transport(_) => error("Could not reach the storefront API"),
        other => error(&other.to_string()),
    }
    anyhow::Error::new(err)
}

async fn login_command(store: &Storefront, username: String, password: String) -> anyhow::Result<()> {
    let credentials = Credentials::new(username, password);
    let session = with_spinner("Logging in...", store.auth().login(&credentials))
        .await
        .map_err(report)?;

    if let Some(user) = session.user {
        success(&format!("Logged in as {}", user.username.cyan()));
        if let Some(balance) = user.balance {
            info(&format!("Balance: {}", price(balance).green()));
        }
    }
    Ok(())
}

async fn logout_command(store: &Storefront) -> anyhow::Result<()> {
    let was_authenticated = store.session().is_authenticated();
    store.auth().logout().await.map_err(report)?;

    if was_authenticated {
        success("Logged out");
    } else {
        info("Already logged out");
    }
    Ok(())
}

async fn register_command(
    store: &Storefront,
    username: String,
    password: String,
    email: Option<String>,
) -> anyhow::Result<()> {
    let registration = Registration { username, password, email };
    let message = with_spinner("Creating account...", store.auth().register(&registration))
        .await
        .map_err(report)?;

    success(&message);
    info(&format!("Log in with: storefront login -u {}", registration.username.cyan()));
    Ok(())
}

async fn whoami_command(store: &Storefront) -> anyhow::Result<()> {
    let session = store.session().current();
    match session.user {
        Some(user) => {
            println!("  {} {}", "User:".bright_white(), user.username.cyan());
            println!("  {} {}", "ID:".bright_white(), user.id);
            if let Some(balance) = user.balance {
                println!("  {} {}", "Balance:".bright_white(), price(balance).green());
            }
            if let Some(at) = session.established_at {
                println!("  {} {}", "Verified:".bright_white(), at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        None => info("Not logged in"),
    }
    Ok(())
}

async fn balance_command(store: &Storefront) -> anyhow::Result<()> {
    let balance = with_spinner("Fetching balance...", store.auth().balance())
        .await
        .map_err(report)?;

    println!("  {} {}", "Balance:".bright_white(), price(balance).green());
    Ok(())
}

async fn recharge_command(store: &Storefront, amount: f64) -> anyhow::Result<()> {
    let receipt = with_spinner("Recharging...", store.auth().recharge(amount))
        .await
        .map_err(report)?;

    success(&format!(
        "{} +{}, balance {}",
        receipt.message,
        price(receipt.amount),
        price(receipt.balance).green()
    ));
    Ok(())
}

async fn products_command(
    store: &Storefront,
    page: u32,
    size: Option<u32>,
    sort: Option<String>,
    category: Option<String>,
) -> anyhow::Result<()> {
    let mut query: ProductQuery = store.catalog().query().page(page);
    if let Some(size) = size {
        query.size = size;
    }
    if let Some(sort) = sort {
        query.sort = sort;
    }
    query.category = category;

    let listing = store.catalog().listing(query);
    with_spinner("Loading products...", listing.load()).await;

    let state = listing.snapshot();
    if let Some(message) = &state.error {
        error(message);
        anyhow::bail!("product listing unavailable");
    }

    let Some(page) = &state.data else {
        info("No products");
        return Ok(());
    };

    println!();
    for product in &page.content {
        let stock = if product.stock == 0 {
            "out of stock".red()
        } else {
            format!("{} in stock", product.stock).green()
        };
        println!(
            "  {:>5}  {:<32} {:>12}  {}",
            product.id.to_string().bright_black(),
            product.name,
            price(product.price).yellow(),
            stock
        );
    }
    println!();
    info(&format!(
        "Page {} of {} ({} products)",
        page.number + 1,
        page.total_pages.max(1),
        page.total_elements
    ));
    Ok(())
}

async fn product_command(store: &Storefront, id: u64) -> anyhow::Result<()> {
    let detail = store.catalog().detail(id);
    with_spinner("Loading product...", detail.load()).await;

    let state = detail.snapshot();
    let Some(product) = &state.data else {
        error(state.error.as_deref().unwrap_or("Product not found"));
        anyhow::bail!("product {} unavailable", id);
    };

    println!();
    println!("  {}", product.name.bright_white().bold());
    if let Some(description) = &product.description {
        println!("  {}", description);
    }
    println!("  {} {}", "Price:".bright_white(), price(product.price).yellow());
    println!("  {} {}", "Stock:".bright_white(), product.stock);
    println!();
    Ok(())
}

async fn stock_command(store: &Storefront, id: u64) -> anyhow::Result<()> {
    let stock = with_spinner("Checking stock...", store.catalog().stock(id))
        .await
        .map_err(report)?;

    println!("  {} {}", stock.product_name.bright_white(), format!("{} in stock", stock.stock).green());
    Ok(())
}

async fn cart_command(store: &Storefront) -> anyhow::Result<()> {
    if !store.session().is_authenticated() {
        return Err(report(StoreError::NotAuthenticated));
    }

    with_spinner("Loading cart...", store.cart().fetch_items())
        .await
        .map_err(report)?;

    print_cart(&store.cart().snapshot());
    Ok(())
}

async fn add_command(store: &Storefront, product_id: u64, quantity: u32) -> anyhow::Result<()> {
    with_spinner("Adding to cart...", store.cart().add_to_cart(product_id, quantity))
        .await
        .map_err(report)?;

    success(&format!("Added {} x product {}", quantity, product_id));
    print_cart(&store.cart().snapshot());
    Ok(())
}

async fn update_command(store: &Storefront, product_id: u64, quantity: u32) -> anyhow::Result<()> {
    with_spinner("Updating cart...", store.cart().update_cart_item(product_id, quantity))
        .await
        .map_err(report)?;

    success("Quantity updated");
    print_cart(&store.cart().snapshot());
    Ok(())
}

async fn remove_command(store: &Storefront, product_id: u64) -> anyhow::Result<()> {
    let result = with_spinner("Removing from cart...", store.cart().remove_from_cart(product_id))
        .await
        .map_err(report)?;

    success(result.message().unwrap_or("Removed from cart"));
    print_cart(&store.cart().snapshot());
    Ok(())
}

async fn clear_command(store: &Storefront) -> anyhow::Result<()> {
    let result = with_spinner("Clearing cart...", store.cart().clear_cart())
        .await
        .map_err(report)?;

    success(result.message().unwrap_or("Cart cleared"));
    Ok(())
}

async fn checkout_command(store: &Storefront) -> anyhow::Result<()> {
    if !store.session().is_authenticated() {
        return Err(report(StoreError::NotAuthenticated));
    }

    // Empty-cart check belongs to the caller
    with_spinner("Loading cart...", store.cart().fetch_items())
        .await
        .map_err(report)?;
    if store.cart().snapshot().is_empty() {
        warning("Your cart is empty, nothing to check out");
        return Ok(());
    }

    let receipt = with_spinner("Checking out...", store.cart().checkout())
        .await
        .map_err(report)?;

    success(&format!(
        "{}! Total {}, remaining balance {}",
        receipt.message,
        price(receipt.total_amount).yellow(),
        price(receipt.remaining_balance).green()
    ));
    Ok(())
}

/// Inspect a configuration that has been read but not yet validated
pub fn config_command(action: ConfigAction, config: &StorefrontConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        ConfigAction::Validate => {
            if let Err(e) = config.validate() {
                error(&format!("Configuration is invalid: {}", e));
                return Err(e);
            }
            success("Configuration is valid");
        }
    }
    Ok(())
}

fn print_cart(cart: &CartSnapshot) {
    println!();
    if cart.is_empty() {
        info("Your cart is empty");
        println!();
        return;
    }

    for item in &cart.items {
        let Some(name) = &item.product_name else {
            println!(
                "  {:>5}  {:<32} {:>3}",
                item.product_id.to_string().bright_black(),
                "(product no longer available)".red(),
                item.quantity
            );
            continue;
        };
        println!(
            "  {:>5}  {:<32} {:>3} x {:>10} = {:>12}",
            item.product_id.to_string().bright_black(),
            name,
            item.quantity,
            item.product_price.map(price).unwrap_or_default(),
            item.total_price.map(price).unwrap_or_default().yellow()
        );
    }
    println!();
    println!(
        "  {} {} lines, {} items, {}",
        "Total:".bright_white(),
        cart.summary.total_items,
        cart.summary.total_quantity,
        price(cart.summary.total_amount).green().bold()
    );
    println!();
}
