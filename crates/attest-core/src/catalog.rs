//! ISO/IEC 27001:2022 Annex A control catalog.
//!
//! The catalog is static: it is inserted once by `Store::seed_controls` and
//! only the assessment columns of the seeded rows ever change afterwards.

use crate::model::Category::{self, Organizational, People, Physical, Technological};
use crate::model::Control;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedControl {
    pub control_id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub category: Category,
}

const fn seed(
    control_id: &'static str,
    title: &'static str,
    description: &'static str,
    category: Category,
) -> SeedControl {
    SeedControl {
        control_id,
        title,
        description,
        category,
    }
}

pub const CATALOG_SIZE: usize = 93;

pub static CATALOG: [SeedControl; CATALOG_SIZE] = [
    seed("A.5.1", "Policies for information security", "Establish and maintain information security policy and topic-specific policies that define the organization's approach to information security", Organizational),
    seed("A.5.2", "Information security roles and responsibilities", "Define and allocate information security responsibilities to ensure clear accountability and ownership of security functions", Organizational),
    seed("A.5.3", "Segregation of duties", "Implement segregation of duties to prevent conflicts of interest and reduce the risk of fraud or error", Organizational),
    seed("A.5.4", "Management responsibilities", "Ensure management demonstrates leadership and commitment to information security through active support and resource allocation", Organizational),
    seed("A.5.5", "Contact with authorities", "Maintain appropriate contacts with relevant authorities to ensure compliance with legal and regulatory requirements", Organizational),
    seed("A.5.6", "Contact with special interest groups", "Engage with special interest groups and professional associations to stay informed about security trends and best practices", Organizational),
    seed("A.5.7", "Threat intelligence", "Collect and analyze information about information security threats to enhance security posture and incident response capabilities", Organizational),
    seed("A.5.8", "Information security in project management", "Integrate information security requirements into project management processes to ensure security is built-in from the start", Organizational),
    seed("A.5.9", "Inventory of information and other associated assets", "Maintain an accurate inventory of information assets and their associated systems, applications, and data stores", Organizational),
    seed("A.5.10", "Acceptable use of information and other associated assets", "Define and communicate rules for acceptable use of information assets to prevent misuse and ensure proper handling", Organizational),
    seed("A.5.11", "Return of assets", "Establish procedures for the secure return of assets when employment ends or access is no longer required", Organizational),
    seed("A.5.12", "Classification of information", "Implement information classification scheme to categorize data based on sensitivity and business impact", Organizational),
    seed("A.5.13", "Labelling of information", "Apply appropriate labels to information assets to indicate classification level and handling requirements", Organizational),
    seed("A.5.14", "Information transfer", "Establish secure procedures for transferring information between parties, including external organizations and third parties", Organizational),
    seed("A.5.15", "Access control", "Implement comprehensive access control policies and procedures to ensure authorized access to information assets", Organizational),
    seed("A.5.16", "Identity management", "Establish identity management processes to create, maintain, and revoke user identities throughout their lifecycle", Organizational),
    seed("A.5.17", "Authentication information", "Implement secure processes for managing authentication credentials, including password policies and multi-factor authentication", Organizational),
    seed("A.5.18", "Access rights", "Define and manage access rights to ensure users have appropriate permissions based on their roles and responsibilities", Organizational),
    seed("A.5.19", "Information security in supplier relationships", "Establish security requirements for supplier relationships to protect information shared with third parties", Organizational),
    seed("A.5.20", "Addressing information security within supplier agreements", "Include specific security requirements in supplier agreements to ensure contractual protection of information assets", Organizational),
    seed("A.5.21", "Managing information security in the ICT supply chain", "Implement security controls throughout the ICT supply chain to mitigate risks from suppliers and vendors", Organizational),
    seed("A.5.22", "Monitoring, review and change management of supplier services", "Continuously monitor and review supplier services to ensure ongoing compliance with security requirements", Organizational),
    seed("A.5.23", "Information security for use of cloud services", "Implement security controls for cloud services to protect data and ensure compliance with security policies", Organizational),
    seed("A.5.24", "Information security incident management planning and preparation", "Develop incident management plans and prepare response teams to effectively handle security incidents", Organizational),
    seed("A.5.25", "Assessment and decision on information security events", "Establish processes to assess security events and make decisions on incident classification and response", Organizational),
    seed("A.5.26", "Response to information security incidents", "Implement incident response procedures to contain, eradicate, and recover from security incidents", Organizational),
    seed("A.5.27", "Learning from information security incidents", "Analyze incidents to identify lessons learned and implement improvements to prevent future occurrences", Organizational),
    seed("A.5.28", "Collection of evidence", "Establish procedures for collecting and preserving evidence during security incidents for forensic analysis and legal proceedings", Organizational),
    seed("A.5.29", "Information security during disruption", "Maintain information security during business disruptions to ensure continuity of security operations", Organizational),
    seed("A.5.30", "ICT readiness for business continuity", "Ensure ICT systems are prepared to support business continuity requirements during disruptions", Organizational),
    seed("A.5.31", "Legal, statutory, regulatory and contractual requirements", "Identify and comply with applicable legal, regulatory, and contractual requirements related to information security", Organizational),
    seed("A.5.32", "Intellectual property rights", "Protect intellectual property rights and ensure compliance with copyright, patent, and trademark laws", Organizational),
    seed("A.5.33", "Protection of records", "Implement controls to protect important records from loss, destruction, and unauthorized access", Organizational),
    seed("A.5.34", "Privacy and protection of personally identifiable information", "Protect personally identifiable information (PII) in accordance with privacy laws and regulations", Organizational),
    seed("A.5.35", "Independent review of information security", "Conduct independent reviews of information security to ensure effectiveness and identify areas for improvement", Organizational),
    seed("A.5.36", "Compliance with policies, rules and standards for information security", "Ensure compliance with established information security policies, rules, and standards", Organizational),
    seed("A.5.37", "Documented operating procedures", "Document operating procedures to ensure consistent and secure execution of security processes", Organizational),
    seed("A.6.1", "Screening", "Conduct comprehensive background verification checks on all employment candidates to ensure trustworthiness and suitability for roles", People),
    seed("A.6.2", "Terms and conditions of employment", "Include information security responsibilities in employment terms and conditions to establish clear expectations", People),
    seed("A.6.3", "Information security awareness, education and training", "Provide ongoing security awareness, education, and training to ensure staff understand security policies and procedures", People),
    seed("A.6.4", "Disciplinary process", "Establish disciplinary procedures for security policy violations to enforce compliance and deter misconduct", People),
    seed("A.6.5", "Responsibilities after termination or change of employment", "Define security responsibilities that continue after employment ends to protect organizational assets", People),
    seed("A.6.6", "Confidentiality or non-disclosure agreements", "Require confidentiality agreements to protect sensitive information and establish legal obligations", People),
    seed("A.6.7", "Remote working", "Implement security controls for remote working to protect information accessed outside organizational premises", People),
    seed("A.6.8", "Information security event reporting", "Establish clear procedures for staff to report security events and incidents for timely response", People),
    seed("A.7.1", "Physical security perimeters", "Establish physical security perimeters to protect information processing facilities from unauthorized access", Physical),
    seed("A.7.2", "Physical entry", "Implement physical entry controls to restrict access to secure areas to authorized personnel only", Physical),
    seed("A.7.3", "Protection against environmental threats", "Protect information processing facilities against environmental threats such as fire, flood, and power failures", Physical),
    seed("A.7.4", "Working in secure areas", "Establish procedures for working in secure areas to maintain physical security controls", Physical),
    seed("A.7.5", "Desk and screen", "Implement clear desk and clear screen policies to prevent unauthorized access to information", Physical),
    seed("A.7.6", "Protection of equipment", "Protect equipment from environmental threats and unauthorized access to prevent damage or theft", Physical),
    seed("A.7.7", "Secure disposal or reuse of equipment", "Ensure secure disposal or reuse of equipment to prevent information leakage and unauthorized access", Physical),
    seed("A.7.8", "Unattended user equipment", "Implement controls for unattended user equipment to prevent unauthorized access and information exposure", Physical),
    seed("A.7.9", "Clear desk and clear screen", "Enforce clear desk and clear screen policies to protect sensitive information from unauthorized viewing", Physical),
    seed("A.7.10", "Storage media", "Implement secure storage media management to protect information from unauthorized access and damage", Physical),
    seed("A.7.11", "Supporting utilities", "Protect supporting utilities such as power, air conditioning, and telecommunications to ensure system availability", Physical),
    seed("A.7.12", "Cabling security", "Secure power and network cabling to prevent unauthorized access and interference with information systems", Physical),
    seed("A.7.13", "Equipment maintenance", "Establish secure equipment maintenance procedures to prevent unauthorized access and ensure system integrity", Physical),
    seed("A.7.14", "Secure disposal or reuse of equipment", "Implement secure disposal procedures for equipment to prevent information leakage and ensure environmental compliance", Physical),
    seed("A.8.1", "User endpoint devices", "Implement security controls for user endpoint devices to protect against threats and unauthorized access", Technological),
    seed("A.8.2", "Privileged access rights", "Control and monitor privileged access rights to prevent abuse and unauthorized system access", Technological),
    seed("A.8.3", "Information access restriction", "Restrict access to information systems and applications based on business requirements and user roles", Technological),
    seed("A.8.4", "Access to source code", "Control access to source code to prevent unauthorized modifications and protect intellectual property", Technological),
    seed("A.8.5", "Secure authentication", "Implement secure authentication mechanisms including multi-factor authentication and strong password policies", Technological),
    seed("A.8.6", "Capacity management", "Monitor and manage system capacity to ensure adequate performance and prevent service degradation", Technological),
    seed("A.8.7", "Protection against malware", "Implement anti-malware controls to detect, prevent, and remove malicious software", Technological),
    seed("A.8.8", "Management of technical vulnerabilities", "Establish vulnerability management processes to identify, assess, and remediate security weaknesses", Technological),
    seed("A.8.9", "Configuration management", "Implement configuration management to maintain secure system settings and prevent unauthorized changes", Technological),
    seed("A.8.10", "Information deletion", "Ensure secure deletion of information to prevent data recovery and unauthorized access", Technological),
    seed("A.8.11", "Data masking", "Implement data masking techniques to protect sensitive information during development and testing", Technological),
    seed("A.8.12", "Data leakage prevention", "Deploy data leakage prevention controls to monitor and prevent unauthorized data exfiltration", Technological),
    seed("A.8.13", "Information backup", "Implement regular backup procedures to ensure data availability and recovery capabilities", Technological),
    seed("A.8.14", "Redundancy of information processing facilities", "Implement redundant systems to ensure business continuity and minimize downtime", Technological),
    seed("A.8.15", "Logging", "Enable comprehensive logging of system activities for security monitoring and incident investigation", Technological),
    seed("A.8.16", "Monitoring activities", "Implement continuous monitoring of information systems to detect security events and anomalies", Technological),
    seed("A.8.17", "Clock synchronisation", "Synchronize system clocks to ensure accurate timestamps for security logs and audit trails", Technological),
    seed("A.8.18", "Use of privileged utility programs", "Control and monitor the use of privileged utility programs to prevent system abuse", Technological),
    seed("A.8.19", "Installation of software on operational systems", "Control software installation on operational systems to prevent unauthorized modifications", Technological),
    seed("A.8.20", "Networks security management", "Implement network security controls to protect against network-based attacks and unauthorized access", Technological),
    seed("A.8.21", "Security of network services", "Secure network services to prevent unauthorized access and ensure service availability", Technological),
    seed("A.8.22", "Segregation of networks", "Implement network segmentation to isolate systems and limit the impact of security incidents", Technological),
    seed("A.8.23", "Web filtering", "Deploy web filtering controls to prevent access to malicious websites and inappropriate content", Technological),
    seed("A.8.24", "Use of cryptography", "Implement cryptographic controls to protect data confidentiality, integrity, and authenticity", Technological),
    seed("A.8.25", "Secure system development life cycle", "Integrate security into the system development life cycle to build security into applications", Technological),
    seed("A.8.26", "Application security requirements", "Define security requirements for applications to ensure secure design and implementation", Technological),
    seed("A.8.27", "Secure system architecture and engineering principles", "Apply secure architecture and engineering principles to design robust and secure systems", Technological),
    seed("A.8.28", "Secure coding", "Implement secure coding practices to prevent common vulnerabilities and security weaknesses", Technological),
    seed("A.8.29", "Security testing in development and acceptance", "Conduct security testing during development and acceptance to identify and remediate vulnerabilities", Technological),
    seed("A.8.30", "Outsourced development", "Establish security requirements for outsourced development to ensure secure code delivery", Technological),
    seed("A.8.31", "Separation of development, test and production environments", "Separate development, test, and production environments to prevent unauthorized access and changes", Technological),
    seed("A.8.32", "Change management", "Implement change management processes to control system modifications and maintain security", Technological),
    seed("A.8.33", "Test information", "Protect test information to prevent exposure of sensitive data during testing activities", Technological),
    seed("A.8.34", "Protection of information systems during audit testing", "Protect information systems during audit testing to prevent disruption and maintain security", Technological),
];

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment<'a> {
    Num(u64),
    Text(&'a str),
}

fn segments(id: &str) -> Vec<Segment<'_>> {
    id.split('.')
        .map(|part| match part.parse::<u64>() {
            Ok(n) => Segment::Num(n),
            Err(_) => Segment::Text(part),
        })
        .collect()
}

/// Orders control identifiers segment by segment, numeric segments as
/// integers: "A.5.2" < "A.5.10" < "A.6.1".
///
/// Identifiers that only differ in zero padding fall back to plain string
/// order so the ordering stays total.
pub fn compare_control_ids(a: &str, b: &str) -> Ordering {
    segments(a).cmp(&segments(b)).then_with(|| a.cmp(b))
}

pub fn sort_controls(controls: &mut [Control]) {
    controls.sort_by(|a, b| compare_control_ids(&a.control_id, &b.control_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn catalog_has_expected_shape() {
        let count = |cat: Category| CATALOG.iter().filter(|c| c.category == cat).count();
        assert_eq!(count(Organizational), 37);
        assert_eq!(count(People), 8);
        assert_eq!(count(Physical), 14);
        assert_eq!(count(Technological), 34);

        let ids: HashSet<_> = CATALOG.iter().map(|c| c.control_id).collect();
        assert_eq!(ids.len(), CATALOG_SIZE);
    }

    #[test]
    fn every_control_sits_in_its_section() {
        for c in CATALOG.iter() {
            assert!(
                c.control_id.starts_with(&format!("{}.", c.category.section())),
                "{} filed under {}",
                c.control_id,
                c.category
            );
        }
    }

    #[test]
    fn numeric_aware_ordering() {
        assert_eq!(compare_control_ids("A.5.2", "A.5.10"), Ordering::Less);
        assert_eq!(compare_control_ids("A.5.37", "A.6.1"), Ordering::Less);
        assert_eq!(compare_control_ids("A.8.34", "A.8.4"), Ordering::Greater);
        assert_eq!(compare_control_ids("A.7.1", "A.7.1"), Ordering::Equal);

        let mut ids = vec!["A.5.10", "A.5.2", "A.5.1", "A.10.1", "A.9.3"];
        ids.sort_by(|a, b| compare_control_ids(a, b));
        assert_eq!(ids, vec!["A.5.1", "A.5.2", "A.5.10", "A.9.3", "A.10.1"]);
    }

    #[test]
    fn catalog_is_declared_in_display_order() {
        let declared: Vec<_> = CATALOG.iter().map(|c| c.control_id).collect();
        let mut sorted = declared.clone();
        sorted.sort_by(|a, b| compare_control_ids(a, b));
        assert_eq!(declared, sorted);
    }
}
