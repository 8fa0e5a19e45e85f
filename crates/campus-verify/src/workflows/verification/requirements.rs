//! Static role-to-document table consumed by the checklist and submission validation.

use super::domain::{DocumentType, UserRole};

use DocumentType::*;

const DRIVER: &[DocumentType] = &[
    IdCard,
    AddressProof,
    DriverLicense,
    VehicleInsurance,
    VehicleRegistration,
];
const LANDLORD: &[DocumentType] = &[IdCard, AddressProof, PropertyProof, HomeInsurance];
const COMPANY: &[DocumentType] = &[KbisSiret, RepresentativeId];
const SCHOOL: &[DocumentType] = &[Accreditation, RepresentativeId];
const PARTNER: &[DocumentType] = &[IdCard, PartnershipProof];

const SCHOOL_SUPPLEMENTARY: &[DocumentType] = &[InternshipConvention, Contract, AdministrativeDoc];
const STUDENT_SUPPLEMENTARY: &[DocumentType] = &[Cv, CoverLetter, Certificate, SignedConvention];

/// Ordered list of documents a role must have approved; empty when nothing is required.
pub fn required_document_types(role: UserRole) -> &'static [DocumentType] {
    match role {
        UserRole::Driver => DRIVER,
        UserRole::Landlord => LANDLORD,
        UserRole::Company => COMPANY,
        UserRole::School => SCHOOL,
        UserRole::Partner => PARTNER,
        UserRole::Student | UserRole::TrainingCenter | UserRole::Recruiter | UserRole::Admin => {
            &[]
        }
    }
}

fn supplementary_document_types(role: UserRole) -> &'static [DocumentType] {
    match role {
        UserRole::School => SCHOOL_SUPPLEMENTARY,
        UserRole::Student => STUDENT_SUPPLEMENTARY,
        _ => &[],
    }
}

/// Upload vocabulary for a role: required types, role extras, then `other`.
pub fn allowed_document_types(role: UserRole) -> Vec<DocumentType> {
    let mut allowed: Vec<DocumentType> = Vec::new();
    for kind in required_document_types(role)
        .iter()
        .chain(supplementary_document_types(role))
        .chain(std::iter::once(&Other))
    {
        if !allowed.contains(kind) {
            allowed.push(*kind);
        }
    }
    allowed
}

pub fn is_allowed(role: UserRole, document_type: DocumentType) -> bool {
    document_type == Other
        || required_document_types(role).contains(&document_type)
        || supplementary_document_types(role).contains(&document_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn required_lists_have_no_duplicates() {
        for role in UserRole::ALL {
            let required = required_document_types(role);
            let unique: HashSet<_> = required.iter().collect();
            assert_eq!(unique.len(), required.len(), "duplicates for {role}");
        }
    }

    #[test]
    fn roles_without_requirements_are_empty() {
        for role in [
            UserRole::Student,
            UserRole::TrainingCenter,
            UserRole::Recruiter,
            UserRole::Admin,
        ] {
            assert!(required_document_types(role).is_empty());
        }
    }

    #[test]
    fn driver_table_is_ordered() {
        assert_eq!(
            required_document_types(UserRole::Driver),
            &[
                IdCard,
                AddressProof,
                DriverLicense,
                VehicleInsurance,
                VehicleRegistration
            ]
        );
    }

    #[test]
    fn vocabulary_covers_required_types_and_other() {
        for role in UserRole::ALL {
            let allowed = allowed_document_types(role);
            for kind in required_document_types(role) {
                assert!(allowed.contains(kind));
                assert!(is_allowed(role, *kind));
            }
            assert_eq!(allowed.last(), Some(&Other));
        }
    }

    #[test]
    fn vocabulary_rejects_foreign_types() {
        assert!(!is_allowed(UserRole::Driver, PropertyProof));
        assert!(!is_allowed(UserRole::Student, DriverLicense));
        assert!(is_allowed(UserRole::Student, Cv));
        assert!(is_allowed(UserRole::School, InternshipConvention));
        assert_eq!(allowed_document_types(UserRole::Admin), vec![Other]);
    }
}
