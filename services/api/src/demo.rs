use crate::infra::LogMailer;
use campus_verify::config::{EmailConfig, VerificationConfig};
use campus_verify::error::AppError;
use campus_verify::workflows::notifications::{EmailDispatch, EmailQueue};
use campus_verify::workflows::verification::{
    requirements, run_maintenance, DocumentType, DocumentUpload, InMemoryVerificationStore,
    Registration, ReviewDecision, UserId, UserRole, VerificationError, VerificationService,
    VerificationStore,
};
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct RequirementsArgs {
    /// Role to describe (driver, landlord, company, school, partner, student...)
    #[arg(long)]
    pub(crate) role: String,
    /// Print the result as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the demo (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Stop once the driver is verified, without simulating document expiry.
    #[arg(long)]
    pub(crate) skip_expiry: bool,
}

#[derive(Debug, Serialize)]
struct RequirementsView {
    role: UserRole,
    required: Vec<DocumentType>,
    allowed: Vec<DocumentType>,
}

pub(crate) fn run_requirements(args: RequirementsArgs) -> Result<(), AppError> {
    let role: UserRole = args.role.parse().map_err(VerificationError::from)?;
    let view = RequirementsView {
        role,
        required: requirements::required_document_types(role).to_vec(),
        allowed: requirements::allowed_document_types(role),
    };

    if args.json {
        match serde_json::to_string_pretty(&view) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => println!("Unable to render requirements as JSON: {err}"),
        }
        return Ok(());
    }

    println!("Documents required for role '{}'", view.role);
    if view.required.is_empty() {
        println!("- none: this role is never verified automatically");
    }
    for kind in &view.required {
        println!("- {} ({})", kind.label(), kind.code());
    }
    println!("Accepted uploads:");
    for kind in &view.allowed {
        println!("- {}", kind.code());
    }
    Ok(())
}

fn upload(kind: DocumentType, expiry_date: Option<NaiveDate>) -> DocumentUpload {
    DocumentUpload {
        document_type: kind.code().to_string(),
        title: kind.label().to_string(),
        description: String::new(),
        storage_key: format!("demo/{}.pdf", kind.code()),
        file_name: format!("{}.pdf", kind.code()),
        size_bytes: Some(350_000),
        expiry_date,
    }
}

fn print_progress<S, E>(service: &VerificationService<S, E>, user: UserId) -> Result<(), AppError>
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let summary = service.get_verification_status(user)?;
    println!(
        "  {}% complete | profile {} | missing: {}",
        summary.completion_percentage,
        summary.user.verification_status,
        if summary.missing_documents.is_empty() {
            "none".to_string()
        } else {
            summary
                .missing_documents
                .iter()
                .map(|kind| kind.code())
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let email_config = EmailConfig {
        workers: 1,
        retry_delay: std::time::Duration::from_millis(10),
        ..EmailConfig::default()
    };
    let (queue, workers) = EmailQueue::spawn(Arc::new(LogMailer), &email_config);
    let service = VerificationService::new(
        Arc::new(InMemoryVerificationStore::default()),
        Arc::new(queue),
        VerificationConfig::default(),
    );

    println!("Document verification demo ({today})");
    let admin = service.register_user(Registration {
        email: "reviews@campus.example".to_string(),
        display_name: "Review desk".to_string(),
        role: "admin".to_string(),
    })?;
    let driver = service.register_user(Registration {
        email: "sam.driver@campus.example".to_string(),
        display_name: "Sam".to_string(),
        role: "driver".to_string(),
    })?;
    println!("- Registered {} ({}) and reviewer {}", driver.id, driver.role, admin.id);

    let insurance_expiry = today + Duration::days(20);
    let uploads = requirements::required_document_types(driver.role)
        .iter()
        .map(|kind| {
            let expiry = (*kind == DocumentType::VehicleInsurance).then_some(insurance_expiry);
            upload(*kind, expiry)
        })
        .collect();
    let documents = service.submit_verification_documents(driver.id, uploads)?;
    println!("- Submitted {} documents", documents.len());
    print_progress(&service, driver.id)?;

    for document in &documents {
        let decision = if document.document_type == DocumentType::DriverLicense {
            ReviewDecision::Reject {
                reason: "illegible".to_string(),
            }
        } else {
            ReviewDecision::Approve
        };
        service.verify_document(document.id, admin.id, decision)?;
    }
    println!("- Reviewed the batch, driver's license rejected");
    print_progress(&service, driver.id)?;

    let replacement = service
        .submit_verification_documents(driver.id, vec![upload(DocumentType::DriverLicense, None)])?
        .remove(0);
    service.verify_document(replacement.id, admin.id, ReviewDecision::Approve)?;
    println!("- Replacement license approved");
    print_progress(&service, driver.id)?;

    if !args.skip_expiry {
        let at = |date: NaiveDate| date.and_time(NaiveTime::MIN).and_utc();
        let report = run_maintenance(&service, at(today))?;
        println!(
            "- Maintenance on {today}: {} reminder(s) sent",
            report.expiry_reminders
        );

        let later = insurance_expiry + Duration::days(1);
        let report = run_maintenance(&service, at(later))?;
        println!(
            "- Maintenance on {later}: {} document(s) expired",
            report.documents_expired
        );
        print_progress(&service, driver.id)?;
    }

    let feed = service.notifications(driver.id)?;
    println!("\nNotifications for {} ({} unread)", driver.id, feed.unread_count);
    for notification in feed.notifications.iter().rev() {
        println!("  [{:?}] {}", notification.kind, notification.message);
    }

    drop(service);
    workers.join().await;
    Ok(())
}
