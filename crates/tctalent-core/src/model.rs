// Copyright (C) 2025 Talent Catalog contributors
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain enums shared by persistence, services and the HTTP layer.
//!
//! Enum values are stored in the database as their `as_str()` form, which is
//! also their JSON representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Failure to decode an enum from its string form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    /// Enum type name.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// All values in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Database and JSON form.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

string_enum! {
    /// Lifecycle status of a candidate.
    pub enum CandidateStatus {
        Active => "active",
        AutonomousEmployment => "autonomousEmployment",
        Deleted => "deleted",
        Draft => "draft",
        Employed => "employed",
        Incomplete => "incomplete",
        Ineligible => "ineligible",
        Pending => "pending",
        RelocatedIndependently => "relocatedIndependently",
        Unreachable => "unreachable",
        Withdrawn => "withdrawn",
    }
}

string_enum! {
    /// Soft-delete status used by task assignments.
    pub enum AssignmentStatus {
        Active => "active",
        Inactive => "inactive",
        Deleted => "deleted",
    }
}

string_enum! {
    /// Kind of work a task asks of a candidate.
    pub enum TaskType {
        Simple => "Simple",
        Question => "Question",
        YesNoQuestion => "YesNoQuestion",
        Upload => "Upload",
    }
}

string_enum! {
    /// Category of document an upload task collects.
    pub enum UploadType {
        Cv => "cv",
        IdCard => "idCard",
        Degree => "degree",
        ConductCertificate => "conductCertificate",
        ResidenceAttestation => "residenceAttestation",
        SalaryProof => "salaryProof",
        Other => "other",
    }
}

string_enum! {
    /// Audience of a job chat.
    pub enum JobChatType {
        AllJobCandidates => "AllJobCandidates",
        CandidateProspect => "CandidateProspect",
        CandidateRecruiting => "CandidateRecruiting",
        JobCreatorSourcePartner => "JobCreatorSourcePartner",
        JobCreatorAllSourcePartners => "JobCreatorAllSourcePartners",
    }
}

string_enum! {
    /// Role of a staff or candidate user.
    pub enum Role {
        SystemAdmin => "systemadmin",
        Admin => "admin",
        PartnerAdmin => "partneradmin",
        Limited => "limited",
        User => "user",
    }
}

string_enum! {
    /// Stage of a candidate's progress through a job opportunity.
    ///
    /// Declaration order is the stage order used for range filters.
    pub enum CandidateOpportunityStage {
        Prospect => "prospect",
        MiniIntake => "miniIntake",
        FullIntake => "fullIntake",
        VisaEligibility => "visaEligibility",
        CvPreparation => "cvPreparation",
        CvReview => "cvReview",
        OneWayPreparation => "oneWayPreparation",
        OneWayReview => "oneWayReview",
        TestPreparation => "testPreparation",
        Testing => "testing",
        InterviewPreparation => "interviewPreparation",
        Interview => "interview",
        Offer => "offer",
        Acceptance => "acceptance",
        ProvincialVisaPreparation => "provincialVisaPreparation",
        ProvincialVisaProcessing => "provincialVisaProcessing",
        VisaPreparation => "visaPreparation",
        VisaProcessing => "visaProcessing",
        Relocating => "relocating",
        Relocated => "relocated",
        Settled => "settled",
        DurableSolution => "durableSolution",
        NoJobOffer => "noJobOffer",
        NoInterest => "noInterest",
        NoVisa => "noVisa",
        NotFitForRole => "notFitForRole",
        NotEligibleForTC => "notEligibleForTC",
        NotEligibleForVisa => "notEligibleForVisa",
        RelocatedNoJobOfferPathway => "relocatedNoJobOfferPathway",
        CandidateLeavesDestination => "candidateLeavesDestination",
        CandidateRejectsOffer => "candidateRejectsOffer",
        CandidateWithdraws => "candidateWithdraws",
        CandidateMismatch => "candidateMismatch",
        JobOfferRetracted => "jobOfferRetracted",
        JobIneligible => "jobIneligible",
        JobWithdrawn => "jobWithdrawn",
    }
}

impl CandidateOpportunityStage {
    /// Stage name as used in Salesforce.
    pub fn sf_name(&self) -> &'static str {
        use CandidateOpportunityStage::*;
        match self {
            Prospect => "Prospect",
            MiniIntake => "Mini intake",
            FullIntake => "Full intake",
            VisaEligibility => "Visa eligibility",
            CvPreparation => "CV preparation",
            CvReview => "CV review",
            OneWayPreparation => "1 way preparation",
            OneWayReview => "1 way review",
            TestPreparation => "Test preparation",
            Testing => "Testing",
            InterviewPreparation => "Interview preparation",
            Interview => "Interview",
            Offer => "Offer",
            Acceptance => "Acceptance",
            ProvincialVisaPreparation => "Provincial visa preparation",
            ProvincialVisaProcessing => "Provincial visa processing",
            VisaPreparation => "Visa preparation",
            VisaProcessing => "Visa processing",
            Relocating => "Relocating",
            Relocated => "Relocated",
            Settled => "Settled",
            DurableSolution => "Durable solution",
            NoJobOffer => "No job offer",
            NoInterest => "No interest",
            NoVisa => "No visa",
            NotFitForRole => "Not fit for role",
            NotEligibleForTC => "Not eligible for TC",
            NotEligibleForVisa => "Not eligible for visa",
            RelocatedNoJobOfferPathway => "Relocated no job offer pathway",
            CandidateLeavesDestination => "Candidate leaves destination",
            CandidateRejectsOffer => "Candidate rejects offer",
            CandidateWithdraws => "Candidate withdraws",
            CandidateMismatch => "Candidate mismatch",
            JobOfferRetracted => "Job offer retracted",
            JobIneligible => "Job ineligible",
            JobWithdrawn => "Job withdrawn",
        }
    }

    /// Position in declaration order.
    pub fn stage_order(&self) -> i32 {
        Self::ALL.iter().position(|s| s == self).unwrap_or_default() as i32
    }

    /// True once the opportunity can no longer progress.
    pub fn is_closed(&self) -> bool {
        self.stage_order() >= Self::Relocated.stage_order()
    }

    /// True for the closed stages that count as success.
    pub fn is_won(&self) -> bool {
        matches!(self, Self::Relocated | Self::Settled | Self::DurableSolution)
    }

    /// True from acceptance of an offer onwards, excluding failure stages.
    pub fn is_employed(&self) -> bool {
        let order = self.stage_order();
        order >= Self::Acceptance.stage_order() && order <= Self::DurableSolution.stage_order()
    }

    /// Decode from either a Salesforce stage name or the enum form.
    pub fn text_to_enum(text: &str) -> Result<Self, ParseEnumError> {
        let trimmed = text.trim();
        Self::ALL
            .iter()
            .find(|s| s.sf_name().eq_ignore_ascii_case(trimmed) || s.as_str() == trimmed)
            .copied()
            .ok_or_else(|| ParseEnumError {
                kind: "CandidateOpportunityStage",
                value: text.to_string(),
            })
    }
}

string_enum! {
    /// Stage of a job opportunity.
    pub enum JobOpportunityStage {
        Prospect => "prospect",
        Briefing => "briefing",
        Pitching => "pitching",
        Mou => "mou",
        IdentifyingRoles => "identifyingRoles",
        CandidateSearch => "candidateSearch",
        VisaEligibility => "visaEligibility",
        CvPreparation => "cvPreparation",
        CvReview => "cvReview",
        RecruitmentProcess => "recruitmentProcess",
        JobOffer => "jobOffer",
        VisaPreparation => "visaPreparation",
        PostHireEngagement => "postHireEngagement",
        HiringCompleted => "hiringCompleted",
        EmployerIneligible => "employerIneligible",
        JobIneligible => "jobIneligible",
        NoJobOffer => "noJobOffer",
        NoPrServiceEligible => "noPrServiceEligible",
        NoInterest => "noInterest",
        NoVisa => "noVisa",
        TooHighWage => "tooHighWage",
        TooLong => "tooLong",
    }
}

impl JobOpportunityStage {
    /// Stage name as used in Salesforce.
    pub fn sf_name(&self) -> &'static str {
        use JobOpportunityStage::*;
        match self {
            Prospect => "Prospect",
            Briefing => "Briefing",
            Pitching => "Pitching",
            Mou => "MOU",
            IdentifyingRoles => "Identifying roles",
            CandidateSearch => "Candidate search",
            VisaEligibility => "Visa eligibility",
            CvPreparation => "CV preparation",
            CvReview => "CV review",
            RecruitmentProcess => "Recruitment process",
            JobOffer => "Job offer",
            VisaPreparation => "Visa preparation",
            PostHireEngagement => "Post hire engagement",
            HiringCompleted => "Hiring completed",
            EmployerIneligible => "Employer ineligible",
            JobIneligible => "Job ineligible",
            NoJobOffer => "No job offer",
            NoPrServiceEligible => "No PR/service eligible",
            NoInterest => "No interest",
            NoVisa => "No visa",
            TooHighWage => "Too high wage",
            TooLong => "Too long",
        }
    }

    /// Position in declaration order.
    pub fn stage_order(&self) -> i32 {
        Self::ALL.iter().position(|s| s == self).unwrap_or_default() as i32
    }

    /// Decode from either a Salesforce stage name or the enum form.
    pub fn text_to_enum(text: &str) -> Result<Self, ParseEnumError> {
        let trimmed = text.trim();
        Self::ALL
            .iter()
            .find(|s| s.sf_name().eq_ignore_ascii_case(trimmed) || s.as_str() == trimmed)
            .copied()
            .ok_or_else(|| ParseEnumError {
                kind: "JobOpportunityStage",
                value: text.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_str() {
        for status in CandidateStatus::ALL {
            assert_eq!(status.as_str().parse::<CandidateStatus>().unwrap(), *status);
        }
        assert_eq!(
            "YesNoQuestion".parse::<TaskType>().unwrap(),
            TaskType::YesNoQuestion
        );
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let err = "sleeping".parse::<AssignmentStatus>().unwrap_err();
        assert_eq!(err.kind, "AssignmentStatus");
        assert!(err.to_string().contains("sleeping"));
    }

    #[test]
    fn test_serde_uses_database_form() {
        let json = serde_json::to_string(&CandidateOpportunityStage::NotEligibleForTC).unwrap();
        assert_eq!(json, "\"notEligibleForTC\"");
        let chat: JobChatType = serde_json::from_str("\"CandidateRecruiting\"").unwrap();
        assert_eq!(chat, JobChatType::CandidateRecruiting);
    }

    #[test]
    fn test_stage_flags() {
        use CandidateOpportunityStage::*;
        assert!(!Prospect.is_closed());
        assert!(!Relocating.is_closed());
        assert!(Relocating.is_employed());
        assert!(Acceptance.is_employed());
        assert!(!Offer.is_employed());
        assert!(Relocated.is_closed() && Relocated.is_won());
        assert!(NoJobOffer.is_closed() && !NoJobOffer.is_won());
        assert!(!NotEligibleForTC.is_employed());
    }

    #[test]
    fn test_text_to_enum_accepts_salesforce_names() {
        assert_eq!(
            CandidateOpportunityStage::text_to_enum("CV review").unwrap(),
            CandidateOpportunityStage::CvReview
        );
        assert_eq!(
            CandidateOpportunityStage::text_to_enum("1 way preparation").unwrap(),
            CandidateOpportunityStage::OneWayPreparation
        );
        assert_eq!(
            CandidateOpportunityStage::text_to_enum("cvReview").unwrap(),
            CandidateOpportunityStage::CvReview
        );
        assert!(CandidateOpportunityStage::text_to_enum("Lunch").is_err());
        assert_eq!(
            JobOpportunityStage::text_to_enum("No PR/service eligible").unwrap(),
            JobOpportunityStage::NoPrServiceEligible
        );
    }

    #[test]
    fn test_stage_order_is_monotonic() {
        let orders: Vec<i32> = CandidateOpportunityStage::ALL
            .iter()
            .map(|s| s.stage_order())
            .collect();
        assert!(orders.windows(2).all(|w| w[0] < w[1]));
    }
}
