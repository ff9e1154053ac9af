//! Submission of orthogroup sequences to a protein annotation service.

pub mod service;
pub mod submit;

pub use service::{AnnotationService, InterProClient, JobStatus, Submission, INTERPRO_URL};
pub use submit::{
    members_from_report, members_from_table, read_orthogroup_list, result_path, sanitize_id,
    submit_all, submit_orthogroup, AnnotationRecord, AnnotationStatus, OrthogroupMembers,
    SubmitOptions, SubmitSummary,
};
