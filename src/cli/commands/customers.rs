use clap::{Args, Subcommand};

use crate::cli::utils::output_data;
use crate::cli::OutputFormat;
use crate::client::api::CustomerFilters;
use crate::client::WebLarekApi;

#[derive(Subcommand)]
pub enum CustomerCommands {
    #[command(about = "List customers")]
    List(ListArgs),

    #[command(about = "Show one customer")]
    Show {
        #[arg(help = "Customer id")]
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long, help = "createdAt, name, totalAmount, orderCount or lastOrderDate")]
    pub sort_field: Option<String>,
    #[arg(long, help = "asc or desc")]
    pub sort_order: Option<String>,
    #[arg(long, help = "YYYY-MM-DD or RFC 3339")]
    pub registered_from: Option<String>,
    #[arg(long, help = "YYYY-MM-DD or RFC 3339")]
    pub registered_to: Option<String>,
    #[arg(long)]
    pub last_order_from: Option<String>,
    #[arg(long)]
    pub last_order_to: Option<String>,
    #[arg(long)]
    pub total_from: Option<f64>,
    #[arg(long)]
    pub total_to: Option<f64>,
    #[arg(long)]
    pub orders_from: Option<i64>,
    #[arg(long)]
    pub orders_to: Option<i64>,
    #[arg(long, help = "Matches name or last delivery address")]
    pub search: Option<String>,
}

impl From<ListArgs> for CustomerFilters {
    fn from(args: ListArgs) -> Self {
        CustomerFilters {
            page: args.page,
            limit: args.limit,
            sort_field: args.sort_field,
            sort_order: args.sort_order,
            registration_date_from: args.registered_from,
            registration_date_to: args.registered_to,
            last_order_date_from: args.last_order_from,
            last_order_date_to: args.last_order_to,
            total_amount_from: args.total_from,
            total_amount_to: args.total_to,
            order_count_from: args.orders_from,
            order_count_to: args.orders_to,
            search: args.search,
        }
    }
}

pub async fn handle(api: &WebLarekApi, cmd: CustomerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        CustomerCommands::List(args) => {
            let page = api.customers(&args.into()).await?;
            match output_format {
                OutputFormat::Json => output_data(&output_format, &page),
                OutputFormat::Text => {
                    let p = &page.pagination;
                    println!(
                        "Page {}/{} ({} customers, {} per page)",
                        p.current_page, p.total_pages, p.total_users, p.page_size
                    );
                    output_data(&output_format, &page.customers)
                }
            }
        }
        CustomerCommands::Show { id } => {
            let customer = api.customer(&id).await?;
            output_data(&output_format, &customer)
        }
    }
}
