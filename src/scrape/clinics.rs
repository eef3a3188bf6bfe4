use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use reqwest::Url;
use scraper::{Html, Selector};
use tracing::{debug, error, info};

use super::{element_text, ScrapeStats};
use crate::data::{self, Clinic, NOT_AVAILABLE};
use crate::http::HttpClient;
use crate::pool;

pub const BASE_URL: &str = "https://www.medpages.info/sf/";

static PAGINATION_LINKS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.pagination-container a").unwrap());
static ANCHORS: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static RESULT_SECTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section.result-record, section.highlight-result").unwrap());
static MAIN_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse("h1.main-name").unwrap());
static MAIN_FIELD: Lazy<Selector> = Lazy::new(|| Selector::parse("h2.main-field").unwrap());
static INFO_ROWS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section.contact-info table.info-table tr").unwrap());
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Listing URL for one results page; the query is form-encoded.
pub fn search_url(query: &str, page: u32) -> Result<String> {
    let page = page.to_string();
    let url = Url::parse_with_params(
        &format!("{}index.php", BASE_URL),
        [
            ("page", "newsearchresults"),
            ("q", query),
            ("sp", "no"),
            ("lat", ""),
            ("long", ""),
            ("pageno", page.as_str()),
        ],
    )?;
    Ok(url.into())
}

// ── Parsing ──

/// The second-to-last pagination link holds the last page number.
pub fn parse_max_page(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let links: Vec<_> = doc.select(&PAGINATION_LINKS).collect();
    let last = links.len().checked_sub(2).map(|i| links[i])?;
    element_text(last).parse().ok()
}

/// Detail links are anchors wrapping a result section. Relative `index.php`
/// links are resolved against the site base.
pub fn parse_listing_links(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for a in doc.select(&ANCHORS) {
        if a.select(&RESULT_SECTION).next().is_none() {
            continue;
        }
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let url = if href.starts_with("index.php") {
            format!("{}{}", BASE_URL, href)
        } else {
            href.to_string()
        };
        if seen.insert(url.clone()) {
            links.push(url);
        }
    }
    links
}

pub fn parse_clinic_details(html: &str) -> Clinic {
    let doc = Html::parse_document(html);
    let first_text = |sel: &Selector| {
        doc.select(sel)
            .next()
            .map(element_text)
            .filter(|t| !t.is_empty())
    };

    let mut clinic = Clinic {
        name: first_text(&MAIN_NAME).unwrap_or_else(|| NOT_AVAILABLE.into()),
        field: first_text(&MAIN_FIELD).unwrap_or_else(|| NOT_AVAILABLE.into()),
        telephone: NOT_AVAILABLE.into(),
        address: NOT_AVAILABLE.into(),
        location: NOT_AVAILABLE.into(),
        email: NOT_AVAILABLE.into(),
    };

    for row in doc.select(&INFO_ROWS) {
        let cells: Vec<_> = row.select(&CELLS).map(element_text).collect();
        let [label, value] = cells.as_slice() else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let slot = if label.contains("Telephone") {
            &mut clinic.telephone
        } else if label.contains("Address") {
            &mut clinic.address
        } else if label.contains("Location") {
            &mut clinic.location
        } else if label.contains("Email") {
            &mut clinic.email
        } else {
            continue;
        };
        *slot = value.clone();
    }

    clinic
}

// ── Fetching ──

pub async fn get_max_page_number(client: &HttpClient, url: &str) -> u32 {
    info!("Fetching max page number from {}", url);
    match client.get(url).await {
        Ok(page) if page.is_ok() => match parse_max_page(&page.body) {
            Some(n) => {
                info!("Max page number: {}", n);
                n
            }
            None => {
                error!("No pagination found at {}", url);
                1
            }
        },
        Ok(page) => {
            error!("Failed to retrieve {}. Status code: {}", url, page.status);
            1
        }
        Err(e) => {
            error!("Error fetching max page number: {:#}", e);
            1
        }
    }
}

pub async fn fetch_clinic_links(client: &HttpClient, url: &str) -> Vec<String> {
    match client.get(url).await {
        Ok(page) if page.is_ok() => {
            let links = parse_listing_links(&page.body);
            debug!("Found {} clinic links on {}", links.len(), url);
            links
        }
        Ok(page) => {
            error!("Failed to retrieve {}. Status code: {}", url, page.status);
            Vec::new()
        }
        Err(e) => {
            error!("Error fetching clinic links from {}: {:#}", url, e);
            Vec::new()
        }
    }
}

pub async fn fetch_clinic_details(client: &HttpClient, url: &str) -> Option<Clinic> {
    match client.get(url).await {
        Ok(page) if page.is_ok() => {
            let clinic = parse_clinic_details(&page.body);
            debug!(name = %clinic.name, telephone = %clinic.telephone, "Scraped clinic");
            Some(clinic)
        }
        Ok(page) => {
            error!("Failed to retrieve {}. Status code: {}", url, page.status);
            None
        }
        Err(e) => {
            error!("Error scraping clinic details from {}: {:#}", url, e);
            None
        }
    }
}

/// Listing pages, then detail pages, both through the worker pool; the CSV is
/// written once at the end.
pub async fn scrape_clinics(
    client: &HttpClient,
    query: &str,
    workers: usize,
    output: &Path,
) -> Result<ScrapeStats> {
    let max_page = get_max_page_number(client, &search_url(query, 1)?).await;
    let page_urls = (1..=max_page)
        .map(|n| search_url(query, n))
        .collect::<Result<Vec<_>>>()?;
    info!("Using {} workers for {} listing pages", workers, page_urls.len());

    let pb = pool::progress_bar(page_urls.len(), "listing pages");
    let c = client.clone();
    let links: Vec<String> = pool::run_unordered(page_urls, workers, &pb, move |url| {
        let client = c.clone();
        async move { fetch_clinic_links(&client, &url).await }
    })
    .await
    .into_iter()
    .flatten()
    .collect();
    pb.finish_and_clear();
    info!("Total clinic links fetched: {}", links.len());

    let pb = pool::progress_bar(links.len(), "clinic details");
    let c = client.clone();
    let clinics: Vec<Clinic> = pool::run_unordered(links, workers, &pb, move |url| {
        let client = c.clone();
        async move { fetch_clinic_details(&client, &url).await }
    })
    .await
    .into_iter()
    .flatten()
    .collect();
    pb.finish_and_clear();
    info!("Total clinic details scraped: {}", clinics.len());

    data::save_csv(output, &clinics, "clinics")?;
    Ok(ScrapeStats {
        pages: max_page as usize,
        records: clinics.len(),
    })
}
