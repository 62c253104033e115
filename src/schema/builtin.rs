//! Builtin template catalog seeded at startup

use super::types::{FieldDefinition, FieldOption, FormSchema, SectionDefinition, Template};

const VERSION: &str = "1.0.0";

fn yes_no() -> Vec<FieldOption> {
    vec![FieldOption::new("Y", "Yes"), FieldOption::new("N", "No")]
}

/// The five published templates, ordered by code.
pub fn templates() -> Vec<Template> {
    vec![adverse_event(), drug_administration(), demographics(), informed_consent(), vital_signs()]
}

fn adverse_event() -> Template {
    let fields = vec![
        FieldDefinition::text("TERM", "Term").required(),
        FieldDefinition::date("START", "Onset date").required(),
        FieldDefinition::date("END", "End date"),
        FieldDefinition::select(
            "SEVERITY",
            "Severity",
            vec![
                FieldOption::new("1", "Mild"),
                FieldOption::new("2", "Moderate"),
                FieldOption::new("3", "Severe"),
            ],
        ),
    ];
    Template::new(
        "AE",
        "Adverse Event",
        VERSION,
        FormSchema::new("AE", "Adverse Event", vec![SectionDefinition::new("AE", "Adverse event", fields)]),
    )
}

fn drug_administration() -> Template {
    let fields = vec![
        FieldDefinition::text("DRUG", "Drug name").required(),
        FieldDefinition::number("DOSE", "Dose (mg)").required().bounded(Some(0.0), None),
        FieldDefinition::date("DATE", "Administration date").required(),
    ];
    Template::new(
        "DA",
        "Drug Administration",
        VERSION,
        FormSchema::new("DA", "Drug Administration", vec![SectionDefinition::new("DA", "Administration", fields)]),
    )
}

fn demographics() -> Template {
    let fields = vec![
        FieldDefinition::date("DOB", "Date of birth").required(),
        FieldDefinition::number("AGE", "Age").read_only(),
        FieldDefinition::select(
            "SEX",
            "Sex",
            vec![FieldOption::new("M", "Male"), FieldOption::new("F", "Female")],
        )
        .required(),
        FieldDefinition::radio("CONSENT", "Consent given", yes_no()).required(),
    ];
    Template::new(
        "DM",
        "Demographics",
        VERSION,
        FormSchema::new("DM", "Demographics", vec![SectionDefinition::new("BASIC", "Basic", fields)]),
    )
}

fn informed_consent() -> Template {
    let fields = vec![
        FieldDefinition::radio("SIGNED", "Consent form signed", yes_no()).required(),
        // Required only when signed; enforced by the IC cross-field rule
        FieldDefinition::date("DATE", "Signature date"),
    ];
    Template::new(
        "IC",
        "Informed Consent",
        VERSION,
        FormSchema::new("IC", "Informed Consent", vec![SectionDefinition::new("IC", "Consent", fields)]),
    )
}

fn vital_signs() -> Template {
    let fields = vec![
        FieldDefinition::number("HEIGHT", "Height (cm)").bounded(Some(50.0), Some(250.0)),
        FieldDefinition::number("WEIGHT", "Weight (kg)").bounded(Some(2.0), Some(400.0)),
        FieldDefinition::number("SBP", "Systolic blood pressure"),
        FieldDefinition::number("DBP", "Diastolic blood pressure"),
        FieldDefinition::number("HR", "Heart rate"),
    ];
    Template::new(
        "VS",
        "Vital Signs",
        VERSION,
        FormSchema::new("VS", "Vital Signs", vec![SectionDefinition::new("VS", "Vital signs", fields)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_are_well_formed() {
        for template in templates() {
            assert!(template.validate_structure().is_ok(), "{}", template.id);
            assert_eq!(template.schema.form_code, template.code);
        }
    }

    #[test]
    fn test_demographics_age_is_read_only() {
        let dm = demographics();
        let age = dm.schema.field("AGE").unwrap();
        assert!(age.read_only);
        assert!(!age.required);
    }
}
