use std::io::{self, Write};

use anyhow::{anyhow, Context, Result};
use bullion_core::api::Method;
use bullion_core::models::{running_balances, totals, LoginCredentials, RegistryEntry};
use bullion_core::utils::{format_amount, format_date, truncate_string};
use bullion_core::{ApiClient, ApiRequest, Config};
use serde_json::Value;
use tracing::{info, warn};

/// Password can come from the environment for scripted use
const PASSWORD_ENV: &str = "BULLION_PASSWORD";

const DESCRIPTION_WIDTH: usize = 32;
const REFERENCE_WIDTH: usize = 12;

pub async fn login(client: &ApiClient, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| client.config().last_username.clone()) {
        Some(name) if !name.is_empty() => name,
        _ => prompt_username()?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    client
        .login(&LoginCredentials {
            username: username.clone(),
            password,
        })
        .await?;

    if let Err(e) = Config::remember_username(&username) {
        warn!(error = %e, "Failed to save config");
    }

    println!("Login successful");
    Ok(())
}

fn prompt_username() -> Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        return Err(anyhow!("Username required"));
    }
    Ok(username)
}

pub async fn logout(client: &ApiClient) -> Result<()> {
    client.logout().await?;
    println!("Logged out");
    Ok(())
}

pub fn status(client: &ApiClient) {
    let config = client.config();
    println!("API:            {}", config.base_url());
    println!("Token backend:  {}", config.token_backend.display_name());
    println!(
        "Signed in:      {}",
        if client.is_authenticated() { "yes" } else { "no" }
    );
    if let Some(ref user) = config.last_username {
        println!("Last user:      {}", user);
    }
}

pub async fn request(
    client: &ApiClient,
    method: &str,
    path: &str,
    query: Vec<(String, String)>,
    data: Option<String>,
) -> Result<()> {
    let mut request = ApiRequest::new(parse_method(method)?, path);
    for (key, value) in query {
        request = request.query(key, value);
    }
    if let Some(raw) = data {
        let body: Value = serde_json::from_str(&raw).context("--data is not valid JSON")?;
        request = request.json_value(body);
    }

    let response = client.send(request).await?;
    info!(status = response.status().as_u16(), "Response received");

    println!("{}", response.status());
    let text = response.text();
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => {}
        Err(_) => println!("{}", text),
    }

    if !response.is_success() {
        return Err(anyhow!("Request failed with {}", response.status()));
    }
    Ok(())
}

pub async fn statement(client: &ApiClient, path: &str, query: Vec<(String, String)>) -> Result<()> {
    let mut request = ApiRequest::get(path);
    for (key, value) in query {
        request = request.query(key, value);
    }
    let entries: Vec<RegistryEntry> = client.send_data(request).await?;

    print!("{}", render_statement(&entries));
    Ok(())
}

/// Newest-first table with a running balance column and a totals footer.
pub fn render_statement(entries: &[RegistryEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12}  {:<rw$}  {:<dw$}  {:>14}  {:>14}  {:>14}\n",
        "Date",
        "Reference",
        "Description",
        "Debit",
        "Credit",
        "Balance",
        rw = REFERENCE_WIDTH,
        dw = DESCRIPTION_WIDTH,
    ));

    for row in running_balances(entries) {
        let entry = &row.entry;
        out.push_str(&format!(
            "{:<12}  {:<rw$}  {:<dw$}  {:>14}  {:>14}  {:>14}\n",
            format_date(&entry.date),
            truncate_string(entry.reference.as_deref().unwrap_or("-"), REFERENCE_WIDTH),
            truncate_string(entry.description.as_deref().unwrap_or(""), DESCRIPTION_WIDTH),
            format_amount(entry.debit),
            format_amount(entry.credit),
            format_amount(row.balance),
            rw = REFERENCE_WIDTH,
            dw = DESCRIPTION_WIDTH,
        ));
    }

    let t = totals(entries);
    out.push_str(&format!(
        "{:<12}  {:<rw$}  {:<dw$}  {:>14}  {:>14}  {:>14}\n",
        "Total",
        "",
        format!("{} entries", entries.len()),
        format_amount(t.debit),
        format_amount(t.credit),
        format_amount(t.balance),
        rw = REFERENCE_WIDTH,
        dw = DESCRIPTION_WIDTH,
    ));
    out
}

fn parse_method(raw: &str) -> Result<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => Err(anyhow!("Unsupported method {}", other)),
    }
}
