//! Static metadata for the disease classes the model distinguishes.
//!
//! The position of an entry in [`CATALOG`] is the index of its probability in the model output.
use common::protocol::{DiseaseDetails, Severity};

/// Number of classes the classifier head outputs.
pub const NUM_CLASSES: usize = 8;

/// One class of the classifier together with its agronomic description.
#[derive(Debug)]
pub struct Disease {
    pub name: &'static str,
    pub icon: &'static str,
    pub kind: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    pub causes: &'static str,
    pub treatment: &'static [&'static str],
    pub prevention: &'static str,
}

impl Disease {
    /// Owned wire representation of this entry.
    pub fn details(&self) -> DiseaseDetails {
        DiseaseDetails {
            icon: self.icon.to_owned(),
            kind: self.kind.to_owned(),
            severity: self.severity,
            description: self.description.to_owned(),
            causes: self.causes.to_owned(),
            treatment: self.treatment.iter().map(|s| s.to_string()).collect(),
            prevention: self.prevention.to_owned(),
        }
    }
}

pub static CATALOG: [Disease; NUM_CLASSES] = [
    Disease {
        name: "Anthracnose",
        icon: "🔴",
        kind: "Fungal Disease",
        severity: Severity::High,
        description: "Dark circular lesions with yellow halos on leaves and fruit",
        causes: "Colletotrichum fungus, high humidity, poor air circulation",
        treatment: &[
            "Apply copper fungicide",
            "Remove infected leaves",
            "Improve ventilation",
            "Avoid overhead watering",
        ],
        prevention: "Regular pruning and sanitation",
    },
    Disease {
        name: "Bacterial Canker",
        icon: "🟠",
        kind: "Bacterial Disease",
        severity: Severity::High,
        description: "Angular water-soaked lesions with yellow halos on leaves",
        causes: "Xanthomonas bacteria, spread by insects and contaminated tools",
        treatment: &[
            "Use copper or streptomycin bactericide",
            "Prune infected branches",
            "Disinfect tools",
            "Avoid wet pruning",
        ],
        prevention: "Use disease-free propagation material",
    },
    Disease {
        name: "Cutting Weevil",
        icon: "🟡",
        kind: "Pest Infestation",
        severity: Severity::Medium,
        description: "Irregular holes in leaves, especially near margins and stem",
        causes: "Cutting weevil larvae feed on leaf tissues",
        treatment: &[
            "Apply neem oil spray",
            "Handpick visible insects",
            "Set light and pheromone traps",
            "Use insecticide if severe",
        ],
        prevention: "Maintain plant vigor and regular monitoring",
    },
    Disease {
        name: "Die Back",
        icon: "🔴",
        kind: "Physiological Disease",
        severity: Severity::High,
        description: "Progressive branch death extending from tip towards base",
        causes: "Poor drainage, waterlogging, nutrient deficiency, cold damage",
        treatment: &[
            "Prune dead wood completely",
            "Improve soil drainage",
            "Reduce nitrogen fertilizer",
            "Monitor irrigation schedule",
        ],
        prevention: "Proper drainage and soil management",
    },
    Disease {
        name: "Gall Midge",
        icon: "🟠",
        kind: "Pest Infestation",
        severity: Severity::Medium,
        description: "Abnormal gall-like leaf growths and deformed tissues",
        causes: "Gall midge larvae induce abnormal plant growth responses",
        treatment: &[
            "Apply neem oil spray",
            "Remove affected leaves",
            "Control humidity levels",
            "Use insecticide if needed",
        ],
        prevention: "Regular monitoring and early intervention",
    },
    Disease {
        name: "Healthy",
        icon: "✅",
        kind: "Healthy Leaf",
        severity: Severity::None,
        description: "No disease detected - leaf is in excellent condition",
        causes: "Proper care and disease prevention practices",
        treatment: &[
            "Continue regular maintenance",
            "Monitor periodically",
            "Maintain good orchard hygiene",
            "Apply preventive sprays",
        ],
        prevention: "Continue current management practices",
    },
    Disease {
        name: "Powdery Mildew",
        icon: "⚪",
        kind: "Fungal Disease",
        severity: Severity::Medium,
        description: "White powdery coating on leaves, stems and fruit surface",
        causes: "Fungal infection, warm dry days with cool nights, poor air circulation",
        treatment: &[
            "Apply sulfur spray",
            "Use potassium bicarbonate",
            "Improve air circulation",
            "Reduce humidity levels",
        ],
        prevention: "Proper spacing and regular pruning",
    },
    Disease {
        name: "Sooty Mould",
        icon: "⚫",
        kind: "Fungal Disease",
        severity: Severity::Medium,
        description: "Black sooty fungal coating on leaves (usually after insect damage)",
        causes: "Secondary fungus growing on insect honeydew deposits",
        treatment: &[
            "Treat honeydew-producing insects first",
            "Wash leaves with water spray",
            "Apply fungicide if needed",
            "Improve air flow",
        ],
        prevention: "Control aphids, scale insects, and mealybugs",
    },
];

/// Class names in model output order.
pub fn class_names() -> Vec<&'static str> {
    CATALOG.iter().map(|d| d.name).collect()
}

/// Find a class by its exact name.
pub fn lookup(name: &str) -> Option<&'static Disease> {
    CATALOG.iter().find(|d| d.name == name)
}

/// Class at position `index` of the model output.
pub fn by_index(index: usize) -> Option<&'static Disease> {
    CATALOG.get(index)
}
