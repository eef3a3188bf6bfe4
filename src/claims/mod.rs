pub mod billing;
pub mod layout;
pub mod logo;
pub mod patient;
pub mod render;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use crate::data::{self, BillingLine, BillingTable, Clinic, Doctor, ReferenceData};
use crate::design::{self, parse_hex_color, Design, DesignStore};
use crate::error::DataError;
use crate::pool;
use crate::settings::{GenerateSettings, Paths};
use layout::{build_layout, ClaimContent, BLACK};
use patient::Patient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Legitimate,
    Fraudulent,
}

impl ClaimKind {
    fn file_prefix(self) -> &'static str {
        match self {
            ClaimKind::Legitimate => "legit",
            ClaimKind::Fraudulent => "fraud",
        }
    }

    pub fn file_name(self, index: usize) -> String {
        format!("{}_claim_{}.pdf", self.file_prefix(), index)
    }
}

impl fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClaimKind::Legitimate => "legitimate",
            ClaimKind::Fraudulent => "fraudulent",
        })
    }
}

/// One planned claim: everything needed to render it independently.
#[derive(Debug, Clone)]
pub struct ClaimJob {
    pub kind: ClaimKind,
    pub clinic: Clinic,
    pub doctor: Doctor,
    pub diagnosis: String,
    pub design: Design,
    pub billing: Vec<BillingLine>,
    pub patient_seed: u64,
    pub destination: PathBuf,
}

/// Pick clinic, doctor and diagnosis for every slot, legitimate slots first.
/// A doctor whose specialty has no diagnosis list leaves the slot empty, so
/// the plan may hold fewer jobs than requested.
pub fn plan_batch<R: Rng + ?Sized>(
    rng: &mut R,
    data: &ReferenceData,
    designs: &DesignStore,
    billing_table: &BillingTable,
    counts: [(ClaimKind, usize); 2],
    output_dir: &Path,
) -> Result<Vec<ClaimJob>, DataError> {
    let mut jobs = Vec::new();

    for (kind, count) in counts {
        for index in 0..count {
            let (Some(clinic), Some(doctor)) = (data.clinics.choose(rng), data.doctors.choose(rng))
            else {
                continue;
            };
            let Some(diagnosis) = data
                .specialties
                .get(&doctor.specialty)
                .and_then(|list| list.choose(rng))
            else {
                continue;
            };
            let design = designs
                .get(&clinic.name)
                .cloned()
                .ok_or_else(|| DataError::MissingDesign(clinic.name.clone()))?;

            jobs.push(ClaimJob {
                kind,
                clinic: clinic.clone(),
                doctor: doctor.clone(),
                diagnosis: diagnosis.clone(),
                design,
                billing: billing::get_billing_items_for_diagnosis(diagnosis, billing_table),
                patient_seed: rng.gen(),
                destination: output_dir.join(kind.file_name(index)),
            });
        }
    }

    Ok(jobs)
}

/// Render one claim. Failures are logged and leave no file behind; returns
/// whether the document was written.
pub fn render_claim(job: &ClaimJob, logos_dir: &Path, date_of_service: NaiveDate) -> bool {
    match try_render_claim(job, logos_dir, date_of_service) {
        Ok(()) => {
            info!("Claim PDF generated successfully: {:?}", job.destination);
            true
        }
        Err(e) => {
            error!("Error generating claim PDF for {}: {:#}", job.kind, e);
            let _ = std::fs::remove_file(&job.destination);
            false
        }
    }
}

fn try_render_claim(job: &ClaimJob, logos_dir: &Path, date_of_service: NaiveDate) -> Result<()> {
    let patient = Patient::from_seed(job.patient_seed);
    let ink = parse_hex_color(&job.design.primary_color).unwrap_or(BLACK);
    let logo = logo::ensure_logo(logos_dir, &job.clinic.name, ink);

    let layout = build_layout(&ClaimContent {
        clinic: &job.clinic,
        doctor: &job.doctor,
        diagnosis: &job.diagnosis,
        patient: &patient,
        design: &job.design,
        billing: &job.billing,
        date_of_service,
        logo,
    })?;
    render::write_pdf(&layout, &job.destination)
}

pub struct GenerateStats {
    pub requested: usize,
    pub planned: usize,
    pub rendered: usize,
}

pub fn generate(paths: &Paths, settings: &GenerateSettings) -> Result<GenerateStats> {
    let seed = settings.seed.unwrap_or_else(rand::random);
    info!(seed, "Generating claims");
    let mut rng = StdRng::seed_from_u64(seed);

    let data = data::load_data(paths)?;
    let designs = design::load_or_create(
        &paths.design_file,
        data.clinics.iter().map(|c| c.name.as_str()),
        &mut rng,
    )?;
    let billing = data::load_billing_items(&paths.billing_json);

    for dir in [&paths.logos_dir, &paths.output_dir] {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    let counts = [
        (ClaimKind::Legitimate, settings.legitimate_count),
        (ClaimKind::Fraudulent, settings.fraudulent_count),
    ];
    let requested = settings.legitimate_count + settings.fraudulent_count;
    let jobs = plan_batch(&mut rng, &data, &designs, &billing, counts, &paths.output_dir)?;
    let planned = jobs.len();
    info!(requested, planned, "Planned claim batch");

    let workers = settings.workers.unwrap_or_else(crate::settings::default_workers);
    let logos_dir = paths.logos_dir.clone();
    let today = chrono::Local::now().date_naive();

    let pb = pool::progress_bar(planned, "Generating Claims");
    let rendered = pool::run_blocking_unordered(jobs, workers, &pb, move |job: ClaimJob| {
        render_claim(&job, &logos_dir, today)
    })?
    .into_iter()
    .filter(|ok| *ok)
    .count();
    pb.finish_and_clear();

    info!(
        "Generated {} of {} planned claims ({} requested)",
        rendered, planned, requested
    );
    Ok(GenerateStats {
        requested,
        planned,
        rendered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn clinic(name: &str) -> Clinic {
        Clinic {
            name: name.into(),
            field: "Clinic".into(),
            telephone: "+230 555 0000".into(),
            address: "1 Main Road".into(),
            location: "Curepipe".into(),
            email: "hello@example.mu".into(),
        }
    }

    fn design() -> Design {
        Design {
            primary_color: "#1f77b4".into(),
            secondary_color: "#aec7e8".into(),
            font: design::FontName::HelveticaBold,
        }
    }

    fn reference(doctors: Vec<Doctor>) -> ReferenceData {
        ReferenceData {
            clinics: vec![clinic("Alpha")],
            doctors,
            specialties: HashMap::from([("GP".to_string(), vec!["Flu".to_string()])]),
        }
    }

    fn designs() -> DesignStore {
        DesignStore::from([("Alpha".to_string(), design())])
    }

    #[test]
    fn unknown_specialty_produces_no_claim() {
        let data = reference(vec![Doctor::new("Dr Z", "Dermatology")]);
        let jobs = plan_batch(
            &mut StdRng::seed_from_u64(1),
            &data,
            &designs(),
            &BillingTable::new(),
            [(ClaimKind::Legitimate, 5), (ClaimKind::Fraudulent, 5)],
            Path::new("out"),
        )
        .unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn mixed_doctors_underfill_the_batch() {
        let data = reference(vec![Doctor::new("Dr A", "GP"), Doctor::new("Dr Z", "Dermatology")]);
        let jobs = plan_batch(
            &mut StdRng::seed_from_u64(11),
            &data,
            &designs(),
            &BillingTable::new(),
            [(ClaimKind::Legitimate, 40), (ClaimKind::Fraudulent, 0)],
            Path::new("out"),
        )
        .unwrap();
        assert!(jobs.len() <= 40);
        assert!(jobs.iter().all(|j| j.doctor.specialty == "GP" && j.diagnosis == "Flu"));
        // no diagnosis entry in the billing table: every job carries the fallback
        assert!(jobs.iter().all(|j| j.billing == billing::fallback_lines()));
    }

    #[test]
    fn file_names_keep_slot_index() {
        let data = reference(vec![Doctor::new("Dr A", "GP")]);
        let jobs = plan_batch(
            &mut StdRng::seed_from_u64(2),
            &data,
            &designs(),
            &BillingTable::new(),
            [(ClaimKind::Legitimate, 2), (ClaimKind::Fraudulent, 1)],
            Path::new("out"),
        )
        .unwrap();
        let names: Vec<_> = jobs.iter().map(|j| j.destination.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("out/legit_claim_0.pdf"),
                PathBuf::from("out/legit_claim_1.pdf"),
                PathBuf::from("out/fraud_claim_0.pdf"),
            ]
        );
    }

    #[test]
    fn missing_design_is_fatal() {
        let data = reference(vec![Doctor::new("Dr A", "GP")]);
        let err = plan_batch(
            &mut StdRng::seed_from_u64(3),
            &data,
            &DesignStore::new(),
            &BillingTable::new(),
            [(ClaimKind::Legitimate, 1), (ClaimKind::Fraudulent, 0)],
            Path::new("out"),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::MissingDesign(name) if name == "Alpha"));
    }

    #[test]
    fn same_seed_same_plan() {
        let data = reference(vec![Doctor::new("Dr A", "GP"), Doctor::new("Dr B", "GP")]);
        let plan = |seed| {
            plan_batch(
                &mut StdRng::seed_from_u64(seed),
                &data,
                &designs(),
                &BillingTable::new(),
                [(ClaimKind::Legitimate, 6), (ClaimKind::Fraudulent, 6)],
                Path::new("out"),
            )
            .unwrap()
            .into_iter()
            .map(|j| (j.doctor.name, j.patient_seed))
            .collect::<Vec<_>>()
        };
        assert_eq!(plan(9), plan(9));
    }

    #[test]
    fn failed_render_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let job = ClaimJob {
            kind: ClaimKind::Fraudulent,
            clinic: clinic("Alpha"),
            doctor: Doctor::new("Dr A", "GP"),
            diagnosis: "Flu".into(),
            design: design(),
            billing: vec![BillingLine::new("Consult", "GP visit", "1", "800", "not a number")],
            patient_seed: 1,
            destination: dir.path().join("fraud_claim_0.pdf"),
        };
        assert!(!render_claim(&job, dir.path(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert!(!job.destination.exists());
    }

    #[test]
    fn end_to_end_two_legitimate_claims() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let paths = Paths {
            clinics_csv: root.join("clinics.csv"),
            doctors_csv: root.join("doctors.csv"),
            specialties_json: root.join("specialties.json"),
            billing_json: root.join("billing.json"),
            design_file: root.join("design.json"),
            logos_dir: root.join("logos"),
            output_dir: root.join("output"),
        };
        std::fs::write(
            &paths.clinics_csv,
            "name,address,telephone,email,location\nAlpha,1 Main Road,+230 555 0000,hello@example.mu,Curepipe\n",
        )
        .unwrap();
        std::fs::write(&paths.doctors_csv, "Doctor Name,Specialty\nDr A,GP\n").unwrap();
        std::fs::write(&paths.specialties_json, r#"{"GP": ["Flu"]}"#).unwrap();
        std::fs::write(
            &paths.billing_json,
            r#"{"diagnoses": {"Flu": {"billing_items": [
                {"Item": "Consult", "Description": "GP visit", "Quantity": "1", "Unit Price": "800", "Total": "800"}
            ]}}}"#,
        )
        .unwrap();

        let settings = GenerateSettings {
            legitimate_count: 2,
            fraudulent_count: 0,
            seed: Some(42),
            workers: Some(2),
        };
        let stats = generate(&paths, &settings).unwrap();
        assert_eq!((stats.requested, stats.planned, stats.rendered), (2, 2, 2));

        let mut outputs: Vec<_> = std::fs::read_dir(&paths.output_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        outputs.sort();
        assert_eq!(outputs, vec!["legit_claim_0.pdf", "legit_claim_1.pdf"]);
        for name in &outputs {
            let bytes = std::fs::read(paths.output_dir.join(name)).unwrap();
            assert!(bytes.starts_with(b"%PDF"));
            assert!(
                shows_text(&bytes, "Total Amount: Rs 800.00"),
                "{} does not show the total",
                name
            );
        }
        assert!(logo::verify_logo(&logo::logo_path(&paths.logos_dir, "Alpha")));
    }

    /// Text operands in the uncompressed content stream are hex strings
    /// (`<546F74...> Tj`) or literal strings.
    fn shows_text(pdf: &[u8], text: &str) -> bool {
        let body = String::from_utf8_lossy(pdf).to_ascii_lowercase();
        let hex: String = text.bytes().map(|b| format!("{:02x}", b)).collect();
        body.contains(&hex) || body.contains(&format!("({})", text.to_ascii_lowercase()))
    }
}
