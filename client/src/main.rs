//! invdash - Inventory Dashboard from the command line
//!
//! Loads every mirrored table once, then runs a single dashboard action:
//! print a table page, the KPI header, the low-stock list, or one of the
//! backend procedures.

use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inventory_dashboard_client::gateway::{Gateway, InMemoryGateway, RestGateway};
use inventory_dashboard_client::services::{InventoryService, PurchasingService, SalesService};
use inventory_dashboard_client::views::{self, RenderedTable};
use inventory_dashboard_client::{Config, EntityStore, Reconciler};
use shared::{DateRange, RowId, SortDirection, Table, TableQuery};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "invdash", version, about = "Inventory, purchasing and sales dashboard")]
struct Cli {
    /// Use the built-in sample catalogue instead of the configured backend
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print one table page
    Show {
        table: Table,

        /// Case-insensitive term matched against every column
        #[arg(long)]
        search: Option<String>,

        /// Column filter as key=value; "all" clears it
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, String)>,

        /// Column to sort by
        #[arg(long)]
        sort: Option<String>,

        #[arg(long, requires = "sort")]
        desc: bool,
    },
    /// Inventory valuation, turnover and sales margins
    Kpi {
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Products at or below their reorder level
    LowStock,
    /// Receive a purchase order
    ReceivePo { id: RowId },
    /// Compute totals and stock movements of a sales order
    RecordSale { id: RowId },
    /// Send a low-stock reminder for a product
    Remind { product_id: RowId },
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{s}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so table output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "invdash=info,inventory_dashboard_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load()?;

    tracing::info!("Environment: {}", config.environment);

    if cli.demo {
        let gateway = Arc::new(InMemoryGateway::demo());
        let store = Arc::new(EntityStore::new(Arc::clone(&gateway)));
        store.load_all().await?;

        let live = if config.sync.live_updates {
            Some(Reconciler::new(Arc::clone(&store)).start(gateway)?)
        } else {
            None
        };
        let outcome = run(&store, cli.command).await;
        if let Some(live) = live {
            live.shutdown().await;
        }
        outcome
    } else {
        tracing::info!("Connecting to {}", config.gateway.url);
        let gateway = Arc::new(RestGateway::new(&config.gateway)?);
        let store = Arc::new(EntityStore::new(gateway));
        store.load_all().await?;
        run(&store, cli.command).await
    }
}

async fn run<G: Gateway>(store: &Arc<EntityStore<G>>, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Show {
            table,
            search,
            filters,
            sort,
            desc,
        } => {
            let mut query = TableQuery::new().with_search(search.unwrap_or_default());
            for (key, value) in filters {
                query.set_filter(key, value);
            }
            if let Some(key) = sort {
                let direction = if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                query = query.sorted_by(key, direction);
            }
            let rendered = store.with_snapshot(|s| views::render(s, table, &query))?;
            print_table(&rendered);
        }
        Command::Kpi { from, to } => {
            let range = DateRange { start: from, end: to };
            let stock = InventoryService::new(Arc::clone(store)).kpis(&range);
            let sales = SalesService::new(Arc::clone(store)).totals(&range);

            println!("Inventory value:      ${:.2}", stock.total_inventory_value);
            println!("Inventory turnover:   {}", stock.inventory_turnover);
            println!("Low-stock products:   {}", stock.low_stock_count);
            println!("Orders:               {}", sales.order_count);
            println!("Revenue:              ${:.2}", sales.total_revenue);
            println!("COGS:                 ${:.2}", sales.total_cogs);
            println!(
                "Gross margin:         ${:.2} ({}%)",
                sales.gross_margin, sales.gross_margin_pct
            );
            println!(
                "Gift orders:          {} (COGS ${:.2}, shipping ${:.2})",
                sales.gift_order_count, sales.total_gift_cogs, sales.total_gift_shipping
            );
            println!(
                "Net margin w/ gifts:  ${:.2} ({}%)",
                sales.net_margin_including_gifts, sales.net_margin_including_gifts_pct
            );
            println!("Units sold:           {}", sales.total_units_sold);
        }
        Command::LowStock => {
            let rendered =
                store.with_snapshot(|s| views::render(s, Table::LowStockAlerts, &TableQuery::new()))?;
            if rendered.rows.is_empty() {
                println!("All products are above their reorder level");
            } else {
                print_table(&rendered);
            }
        }
        Command::ReceivePo { id } => {
            PurchasingService::new(Arc::clone(store))
                .receive_purchase_order(id)
                .await?;
            println!("Purchase order #{id} received");
        }
        Command::RecordSale { id } => {
            SalesService::new(Arc::clone(store)).record_sale(id).await?;
            println!("Sale #{id} recorded");
        }
        Command::Remind { product_id } => {
            let reminder = InventoryService::new(Arc::clone(store))
                .send_reminder(product_id)
                .await?;
            println!(
                "Reminder sent for product #{}: {} on hand, reorder level {}",
                reminder.product_id, reminder.on_hand, reminder.reorder_level
            );
        }
    }
    Ok(())
}

fn print_table(table: &RenderedTable) {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", line(&table.headers[..]));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  ")
    );
    for row in &table.rows {
        println!("{}", line(&row[..]));
    }
    println!("({} rows)", table.rows.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("type=kit").unwrap(),
            ("type".to_string(), "kit".to_string())
        );
        assert_eq!(
            parse_filter("vendor = Fastener Supply").unwrap(),
            ("vendor".to_string(), "Fastener Supply".to_string())
        );
        assert!(parse_filter("type").is_err());
        assert!(parse_filter("=kit").is_err());
    }

    #[test]
    fn test_cli_parses_show_with_filters() {
        let cli = Cli::try_parse_from([
            "invdash", "--demo", "show", "products", "--filter", "type=kit", "--sort", "sku",
            "--desc",
        ])
        .unwrap();
        assert!(cli.demo);
        match cli.command {
            Command::Show {
                table,
                filters,
                sort,
                desc,
                ..
            } => {
                assert_eq!(table, Table::Products);
                assert_eq!(filters, vec![("type".to_string(), "kit".to_string())]);
                assert_eq!(sort.as_deref(), Some("sku"));
                assert!(desc);
            }
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_desc_requires_sort() {
        assert!(Cli::try_parse_from(["invdash", "show", "products", "--desc"]).is_err());
    }
}
