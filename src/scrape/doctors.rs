use std::path::Path;

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{error, info, warn};

use super::{element_text, ScrapeStats};
use crate::data::{self, Doctor};
use crate::http::HttpClient;
use crate::pool;

const COUNCIL_URL: &str = "https://medicalcouncilmu.org";

static ROWS: Lazy<Selector> = Lazy::new(|| Selector::parse("table#doctor-list-result tr").unwrap());
static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table#doctor-list-result").unwrap());
static CELLS: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Both registries for one letter: general doctors, then registered specialists.
pub fn letter_urls(letter: char) -> [String; 2] {
    [
        format!("{}/doctors-list/?alphabet={}", COUNCIL_URL, letter),
        format!("{}/list-of-registered-specialists/?alphabet={}", COUNCIL_URL, letter),
    ]
}

/// `None` when the result table is absent; the header row is skipped.
pub fn parse_doctor_table(html: &str) -> Option<Vec<Doctor>> {
    let doc = Html::parse_document(html);
    doc.select(&TABLE).next()?;

    let doctors = doc
        .select(&ROWS)
        .skip(1)
        .filter_map(|row| {
            let cells: Vec<_> = row.select(&CELLS).map(element_text).collect();
            match cells.as_slice() {
                [name, specialty, ..] if !name.is_empty() && !specialty.is_empty() => {
                    Some(Doctor::new(name.as_str(), specialty.as_str()))
                }
                _ => None,
            }
        })
        .collect();
    Some(doctors)
}

pub async fn fetch_doctors(client: &HttpClient, url: &str) -> Vec<Doctor> {
    let page = match client.get(url).await {
        Ok(page) if page.is_ok() => page,
        Ok(page) => {
            error!("Failed to retrieve {}. Status code: {}", url, page.status);
            return Vec::new();
        }
        Err(e) => {
            error!("Error fetching {}: {:#}", url, e);
            return Vec::new();
        }
    };

    match parse_doctor_table(&page.body) {
        Some(doctors) => {
            info!("Found {} doctor(s) in {}", doctors.len(), url);
            doctors
        }
        None => {
            warn!("Table not found at {}", url);
            Vec::new()
        }
    }
}

pub async fn scrape_letter(client: &HttpClient, letter: char) -> Vec<Doctor> {
    let [doctors_url, specialists_url] = letter_urls(letter);
    let mut doctors = fetch_doctors(client, &doctors_url).await;
    doctors.extend(fetch_doctors(client, &specialists_url).await);
    doctors
}

pub async fn scrape_doctors(client: &HttpClient, workers: usize, output: &Path) -> Result<ScrapeStats> {
    let letters: Vec<char> = ('A'..='Z').collect();
    info!("Using {} workers for {} letters", workers, letters.len());

    let pb = pool::progress_bar(letters.len(), "letters");
    let c = client.clone();
    let doctors: Vec<Doctor> = pool::run_unordered(letters.clone(), workers, &pb, move |letter| {
        let client = c.clone();
        async move { scrape_letter(&client, letter).await }
    })
    .await
    .into_iter()
    .flatten()
    .collect();
    pb.finish_and_clear();

    info!("Saving {} doctor(s) and specialist(s)", doctors.len());
    data::save_csv(output, &doctors, "doctors")?;
    Ok(ScrapeStats {
        pages: letters.len() * 2,
        records: doctors.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctor_rows_skip_header_and_blanks() {
        let html = std::fs::read_to_string("tests/fixtures/doctor_list.html").unwrap();
        let doctors = parse_doctor_table(&html).unwrap();
        assert_eq!(
            doctors,
            vec![
                Doctor::new("Dr Anil Ramdin", "General Practitioner"),
                Doctor::new("Dr Marie Laval", "Cardiology"),
                Doctor::new("Dr Anil Ramdin", "General Practitioner"),
            ]
        );
    }

    #[test]
    fn missing_table_is_none() {
        assert!(parse_doctor_table("<html><body><table id=\"other\"></table></body></html>").is_none());
    }

    #[test]
    fn urls_per_letter() {
        let [d, s] = letter_urls('Q');
        assert_eq!(d, "https://medicalcouncilmu.org/doctors-list/?alphabet=Q");
        assert_eq!(s, "https://medicalcouncilmu.org/list-of-registered-specialists/?alphabet=Q");
    }
}
