//! Reference text for each screening class.

use serde::{Deserialize, Serialize};

/// Description, typical signs and advice for a predicted class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    /// Display name.
    pub name: String,
    /// One-paragraph summary.
    pub description: String,
    /// Typical signs.
    pub symptoms: Vec<String>,
    /// Common causes.
    pub causes: Vec<String>,
    /// Treatment options.
    pub treatment: Vec<String>,
    /// How soon to seek care.
    pub urgency: String,
}

struct Entry {
    label: &'static str,
    name: &'static str,
    description: &'static str,
    symptoms: &'static [&'static str],
    causes: &'static [&'static str],
    treatment: &'static [&'static str],
    urgency: &'static str,
}

const ENTRIES: &[Entry] = &[
    Entry {
        label: "Oral_Cancer",
        name: "Oral Cancer Signs Detected",
        description: "Oral cancer is a serious condition where malignant cells form in the tissues of the mouth. Early detection is critical for survival.",
        symptoms: &[
            "White or red patches in mouth",
            "Non-healing sores or ulcers (>2 weeks)",
            "Lumps or thickening in cheek",
            "Difficulty swallowing or chewing",
            "Numbness in tongue or mouth",
            "Unexplained bleeding",
        ],
        causes: &[
            "Tobacco use (smoking, chewing)",
            "Excessive alcohol",
            "HPV infection",
            "Sun exposure (lip cancer)",
            "Poor nutrition",
        ],
        treatment: &[
            "Surgical removal",
            "Radiation therapy",
            "Chemotherapy",
            "Targeted drug therapy",
        ],
        urgency: "IMMEDIATE - See an oncologist within 24-48 hours",
    },
    Entry {
        label: "Ulcers",
        name: "Mouth Ulcers (Canker Sores)",
        description: "Mouth ulcers are painful sores that appear inside the mouth. Most heal within 1-2 weeks.",
        symptoms: &[
            "Painful round/oval sores",
            "White/yellow center with red border",
            "Burning sensation before appearance",
            "Difficulty eating spicy/acidic foods",
        ],
        causes: &[
            "Stress",
            "Minor injuries",
            "Acidic foods",
            "Vitamin deficiencies (B12, iron)",
            "Hormonal changes",
        ],
        treatment: &[
            "Antiseptic mouthwash",
            "Pain-relieving gels",
            "Avoid spicy foods",
            "Vitamin supplements",
            "Salt water rinse",
        ],
        urgency: "Monitor - See dentist if persists >2 weeks",
    },
    Entry {
        label: "Gingivitis",
        name: "Gingivitis (Gum Disease)",
        description: "Gingivitis is inflammation of the gums, usually caused by bacterial infection. If untreated, it can lead to periodontitis.",
        symptoms: &[
            "Red, swollen gums",
            "Bleeding while brushing/flossing",
            "Bad breath (halitosis)",
            "Receding gums",
            "Tender gums",
        ],
        causes: &[
            "Poor oral hygiene",
            "Plaque buildup",
            "Smoking",
            "Diabetes",
            "Certain medications",
        ],
        treatment: &[
            "Professional cleaning",
            "Improved brushing technique",
            "Antibacterial mouthwash",
            "Regular flossing",
            "Dental checkups",
        ],
        urgency: "Schedule dental visit within 2 weeks",
    },
    Entry {
        label: "Caries",
        name: "Dental Caries (Cavities)",
        description: "Cavities are permanently damaged areas in teeth that develop into tiny holes. They are among the most common health problems.",
        symptoms: &[
            "Toothache or sensitivity",
            "Pain when eating sweet/hot/cold",
            "Visible holes in teeth",
            "Brown/black staining",
            "Bad breath",
        ],
        causes: &[
            "Frequent snacking",
            "Sugary drinks",
            "Poor brushing",
            "Dry mouth",
            "Bacteria in mouth",
        ],
        treatment: &[
            "Dental fillings",
            "Crowns (severe cases)",
            "Root canal (deep decay)",
            "Fluoride treatments",
            "Tooth extraction (extreme)",
        ],
        urgency: "Schedule dental visit within 1-2 weeks",
    },
    Entry {
        label: "Calculus",
        name: "Calculus (Tartar)",
        description: "Calculus is hardened tartar buildup on teeth. It cannot be removed by regular brushing and requires professional cleaning.",
        symptoms: &[
            "Yellow/brown deposits on teeth",
            "Rough feeling on teeth",
            "Bad breath",
            "Gum irritation",
            "Bleeding gums",
        ],
        causes: &[
            "Poor oral hygiene",
            "Not flossing",
            "Smoking",
            "Dry mouth",
            "Diet high in sugar/starch",
        ],
        treatment: &[
            "Professional scaling",
            "Root planing",
            "Improved oral hygiene",
            "Regular dental cleanings",
            "Electric toothbrush",
        ],
        urgency: "Schedule dental cleaning within 1 month",
    },
    Entry {
        label: "Tooth Discoloration",
        name: "Tooth Discoloration",
        description: "Tooth discoloration refers to staining or changes in tooth color. It can be extrinsic (surface) or intrinsic (internal).",
        symptoms: &[
            "Yellow or brown teeth",
            "White spots on teeth",
            "Gray or dark teeth",
            "Uneven coloring",
        ],
        causes: &[
            "Coffee, tea, wine",
            "Tobacco use",
            "Poor hygiene",
            "Medications",
            "Aging",
            "Fluorosis",
        ],
        treatment: &[
            "Professional whitening",
            "Whitening toothpaste",
            "Dental veneers",
            "Bonding",
            "Better oral hygiene",
        ],
        urgency: "Non-urgent - Cosmetic concern",
    },
    Entry {
        label: "Hypodontia",
        name: "Hypodontia (Missing Teeth)",
        description: "Hypodontia is a condition where one or more teeth fail to develop. It can affect appearance and dental function.",
        symptoms: &[
            "Gaps in teeth",
            "Difficulty chewing",
            "Speech problems",
            "Jawbone issues",
            "Self-esteem concerns",
        ],
        causes: &[
            "Genetic factors",
            "Developmental issues",
            "Trauma",
            "Infection during development",
        ],
        treatment: &[
            "Dental implants",
            "Bridges",
            "Partial dentures",
            "Orthodontic treatment",
            "Space maintainers",
        ],
        urgency: "Non-urgent - Consult dentist for options",
    },
    Entry {
        label: "Normal_Mouth",
        name: "Healthy Mouth",
        description: "Your oral health appears normal. Continue maintaining good oral hygiene practices.",
        symptoms: &[
            "Pink, firm gums",
            "No bleeding when brushing",
            "Fresh breath",
            "Clean teeth",
            "No pain or sensitivity",
        ],
        causes: &[],
        treatment: &[
            "Continue brushing twice daily",
            "Floss daily",
            "Regular dental checkups",
            "Balanced diet",
            "Limit sugary foods",
        ],
        urgency: "Routine checkup every 6 months",
    },
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

impl DiseaseInfo {
    /// Reference text for `label`, if it is a known class.
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        ENTRIES.iter().find(|e| e.label == label).map(|e| Self {
            name: e.name.to_string(),
            description: e.description.to_string(),
            symptoms: owned(e.symptoms),
            causes: owned(e.causes),
            treatment: owned(e.treatment),
            urgency: e.urgency.to_string(),
        })
    }
}
