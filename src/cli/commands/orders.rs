use clap::Subcommand;

use crate::cli::utils::output_data;
use crate::cli::OutputFormat;
use crate::client::api::OrderStatus;
use crate::client::WebLarekApi;

#[derive(Subcommand)]
pub enum OrderCommands {
    #[command(about = "Change the status of an order")]
    Status {
        #[arg(help = "Order number")]
        order_number: String,
        #[arg(help = "new, delivering, completed or cancelled")]
        status: OrderStatus,
    },
}

pub async fn handle(api: &WebLarekApi, cmd: OrderCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        OrderCommands::Status { order_number, status } => {
            let order = api.update_order_status(&order_number, status).await?;
            output_data(&output_format, &order)
        }
    }
}
