use anyhow::Result;

// Print the generated OpenAPI document.
fn main() -> Result<()> {
    let openapi = pinauth::api::openapi();
    println!("{}", openapi.to_pretty_json()?);
    Ok(())
}
