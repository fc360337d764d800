//! Document rendering.
//!
//! The worker hands a context to a `DocumentRenderer` and stores whatever
//! comes back. The bundled implementation renders HTML through handlebars;
//! PDF conversion belongs to the external document service and is not a
//! concern of this crate.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde::Serialize;

const CERTIFICATE_TEMPLATE: &str = include_str!("../templates/certificate.hbs");
const FIELD_REPORT_TEMPLATE: &str = include_str!("../templates/field_report.hbs");

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("render error: {0}")]
    Engine(#[from] handlebars::RenderError),
}

/// Rendered bytes plus the metadata the worker needs to store them.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentSummary {
    pub tag_code: String,
    pub equipment_type: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub swl: Option<String>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerLine {
    pub question_key: String,
    pub result: String,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificateContext {
    pub certificate_number: String,
    pub verification_url: String,
    pub issued_date: DateTime<Utc>,
    pub is_safe: bool,
    pub approver_name: String,
    pub inspector_name: String,
    pub client_name: String,
    pub po_reference: String,
    pub site_location: String,
    pub equipment: Option<EquipmentSummary>,
    pub answers: Vec<AnswerLine>,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportInspectionLine {
    pub inspection_id: i64,
    pub status: String,
    pub inspector_name: String,
    pub equipment_tag: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldReportContext {
    pub job_order_id: i64,
    pub po_reference: String,
    pub client_name: String,
    pub site_location: String,
    pub generated_at: DateTime<Utc>,
    pub total_inspections: i64,
    pub approved_inspections: i64,
    pub pending_inspections: i64,
    pub inspections: Vec<ReportInspectionLine>,
    pub company_name: String,
}

pub trait DocumentRenderer: Send + Sync {
    fn render_certificate(&self, ctx: &CertificateContext) -> Result<RenderedDocument, RenderError>;

    fn render_field_report(&self, ctx: &FieldReportContext)
        -> Result<RenderedDocument, RenderError>;
}

/// Handlebars-backed HTML renderer with templates compiled in.
pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string("certificate", CERTIFICATE_TEMPLATE)
            .map_err(Box::new)?;
        registry
            .register_template_string("field_report", FIELD_REPORT_TEMPLATE)
            .map_err(Box::new)?;
        Ok(Self { registry })
    }
}

impl DocumentRenderer for HandlebarsRenderer {
    fn render_certificate(
        &self,
        ctx: &CertificateContext,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.registry.render("certificate", ctx)?;
        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            content_type: "text/html",
            extension: "html",
        })
    }

    fn render_field_report(
        &self,
        ctx: &FieldReportContext,
    ) -> Result<RenderedDocument, RenderError> {
        let html = self.registry.render("field_report", ctx)?;
        Ok(RenderedDocument {
            bytes: html.into_bytes(),
            content_type: "text/html",
            extension: "html",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn certificate_context() -> CertificateContext {
        CertificateContext {
            certificate_number: "CERT-202600000042".to_string(),
            verification_url: "https://example.test/verify/CERT-202600000042".to_string(),
            issued_date: Utc::now(),
            is_safe: true,
            approver_name: "T. Manager".to_string(),
            inspector_name: "I. Spector".to_string(),
            client_name: "Acme Logistics".to_string(),
            po_reference: "PO-889".to_string(),
            site_location: "Yard 4".to_string(),
            equipment: Some(EquipmentSummary {
                tag_code: "EQ-0007".to_string(),
                equipment_type: "Overhead crane".to_string(),
                manufacturer: "Demag".to_string(),
                model: "EKKE".to_string(),
                serial_number: "SN-1".to_string(),
                swl: Some("5000.00".to_string()),
                location: "Bay 2".to_string(),
            }),
            answers: vec![AnswerLine {
                question_key: "HOOK_CONDITION".to_string(),
                result: "SAFE".to_string(),
                comment: String::new(),
            }],
            company_name: "TUV Inspection Services".to_string(),
        }
    }

    #[test]
    fn test_certificate_renders_number_and_verdict() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let doc = renderer.render_certificate(&certificate_context()).unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();

        assert!(html.contains("CERT-202600000042"));
        assert!(html.contains("Acme Logistics"));
        assert!(html.contains("EQ-0007"));
        assert!(html.contains("SAFE"));
        assert_eq!(doc.extension, "html");
    }

    #[test]
    fn test_certificate_without_equipment_still_renders() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let mut ctx = certificate_context();
        ctx.equipment = None;
        assert!(renderer.render_certificate(&ctx).is_ok());
    }

    #[test]
    fn test_field_report_lists_inspections() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let ctx = FieldReportContext {
            job_order_id: 12,
            po_reference: "PO-889".to_string(),
            client_name: "Acme Logistics".to_string(),
            site_location: "Yard 4".to_string(),
            generated_at: Utc::now(),
            total_inspections: 2,
            approved_inspections: 1,
            pending_inspections: 1,
            inspections: vec![ReportInspectionLine {
                inspection_id: 3,
                status: "APPROVED".to_string(),
                inspector_name: "I. Spector".to_string(),
                equipment_tag: "EQ-0007".to_string(),
                start_time: None,
                end_time: None,
            }],
            company_name: "TUV Inspection Services".to_string(),
        };
        let doc = renderer.render_field_report(&ctx).unwrap();
        let html = String::from_utf8(doc.bytes).unwrap();
        assert!(html.contains("PO-889"));
        assert!(html.contains("EQ-0007"));
    }
}
