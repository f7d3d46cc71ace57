use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::client::WebLarekApi;

pub async fn csrf_token(api: &WebLarekApi, output_format: OutputFormat) -> anyhow::Result<()> {
    let token = api.client().csrf_token().await?;
    match output_format {
        OutputFormat::Json => output_success(&output_format, "CSRF token issued", Some(json!({ "csrfToken": token }))),
        OutputFormat::Text => {
            println!("{}", token);
            Ok(())
        }
    }
}

pub async fn refresh(api: &WebLarekApi, output_format: OutputFormat) -> anyhow::Result<()> {
    api.client().refresh().await?;
    output_success(&output_format, "Access token refreshed and saved", None)
}
