use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::WebLarekApi;

#[derive(Subcommand)]
pub enum ProductCommands {
    #[command(about = "Delete a product")]
    Delete {
        #[arg(help = "Product id")]
        id: String,
    },
}

pub async fn handle(api: &WebLarekApi, cmd: ProductCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ProductCommands::Delete { id } => {
            let product = api.delete_product(&id).await?;
            output_success(
                &output_format,
                &format!("Product '{}' deleted", product.title),
                Some(json!({ "product": product })),
            )
        }
    }
}
