//! Region catalog
//!
//! Static collection of known districts. The built-in table covers the
//! Madhya Pradesh districts (state code 17); a JSON file of `Region`
//! values can replace it at startup.
//!
//! Catalog order is significant: the nearest-region resolver breaks distance
//! ties in favour of the region that appears first.

use std::collections::HashMap;
use std::path::Path;

use rozgar_common::{Coordinate, Error, Region, Result};
use serde::Serialize;

const MP_STATE_NAME: &str = "Madhya Pradesh";
const MP_STATE_CODE: &str = "17";

/// (district code, English name, Hindi name, latitude, longitude)
const MP_DISTRICTS: &[(&str, &str, &str, f64, f64)] = &[
    ("1701", "Sheopur", "श्योपुर", 25.6697, 76.6947),
    ("1702", "Morena", "मुरैना", 26.5015, 78.0014),
    ("1703", "Bhind", "भिंड", 26.5653, 78.7875),
    ("1704", "Gwalior", "ग्वालियर", 26.2183, 78.1828),
    ("1705", "Datia", "दतिया", 25.6669, 78.4574),
    ("1706", "Shivpuri", "शिवपुरी", 25.4231, 77.6581),
    ("1707", "Tikamgarh", "टीकमगढ़", 24.7433, 78.8353),
    ("1708", "Chhatarpur", "छतरपुर", 24.9177, 79.5941),
    ("1709", "Panna", "पन्ना", 24.7213, 80.1919),
    ("1710", "Sagar", "सागर", 23.8388, 78.7378),
    ("1711", "Damoh", "दमोह", 23.8315, 79.4422),
    ("1712", "Satna", "सतना", 24.5707, 80.8320),
    ("1713", "Rewa", "रीवा", 24.5364, 81.2961),
    ("1714", "Umaria", "उमरिया", 23.5236, 80.8372),
    ("1715", "Neemuch", "नीमच", 24.4739, 74.8706),
    ("1716", "Mandsaur", "मंदसौर", 24.0767, 75.0700),
    ("1717", "Ratlam", "रतलाम", 23.3315, 75.0367),
    ("1718", "Ujjain", "उज्जैन", 23.1765, 75.7885),
    ("1719", "Shajapur", "शाजापुर", 23.4267, 76.2738),
    ("1720", "Dewas", "देवास", 22.9676, 76.0534),
    ("1721", "Jhabua", "झाबुआ", 22.7676, 74.5953),
    ("1722", "Dhar", "धार", 22.5979, 75.2979),
    ("1723", "Indore", "इंदौर", 22.7196, 75.8577),
    ("1724", "West Nimar (Khargone)", "पश्चिम निमाड़", 21.8236, 75.6147),
    ("1725", "Barwani", "बड़वानी", 22.0322, 74.9006),
    ("1726", "Rajgarh", "राजगढ़", 24.0073, 76.8441),
    ("1727", "Vidisha", "विदिशा", 23.5251, 77.8081),
    ("1728", "Bhopal", "भोपाल", 23.2599, 77.4126),
    ("1729", "Sehore", "सीहोर", 23.2021, 77.0854),
    ("1730", "Raisen", "रायसेन", 23.3315, 77.7824),
    ("1731", "Betul", "बैतूल", 21.9057, 77.8986),
    ("1732", "Harda", "हरदा", 22.3442, 77.0953),
    ("1733", "Hoshangabad", "होशंगाबाद", 22.7440, 77.7282),
    ("1734", "Katni", "कटनी", 23.8346, 80.3942),
    ("1735", "Jabalpur", "जबलपुर", 23.1815, 79.9864),
    ("1736", "Narsinghpur", "नरसिंहपुर", 22.9676, 79.1947),
    ("1737", "Dindori", "डिंडोरी", 22.9441, 81.0784),
    ("1738", "Mandla", "मंडला", 22.5979, 80.3714),
    ("1739", "Chhindwara", "छिंदवाड़ा", 22.0567, 78.9378),
    ("1740", "Seoni", "सिवनी", 22.0862, 79.5431),
    ("1741", "Balaghat", "बालाघाट", 21.8047, 80.1847),
    ("1742", "Guna", "गुना", 24.6473, 77.3072),
    ("1743", "Ashoknagar", "अशोकनगर", 24.5726, 77.7299),
    ("1745", "East Nimar (Khandwa)", "पूर्व निमाड़", 21.8362, 76.3500),
    ("1746", "Burhanpur", "बुरहानपुर", 21.3009, 76.2291),
    ("1747", "Alirajpur", "अलीराजपुर", 22.3021, 74.3644),
    ("1748", "Anuppur", "अनूपपुर", 23.1041, 81.6905),
    ("1749", "Singrauli", "सिंगरौली", 24.1997, 82.6739),
    ("1750", "Sidhi", "सीधी", 24.4186, 81.8797),
    ("1751", "Shahdol", "शहडोल", 23.2967, 81.3615),
    ("1752", "Agar Malwa", "आगर मालवा", 23.7117, 76.0153),
];

/// One state covered by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSummary {
    pub state_code: String,
    pub name: String,
    pub region_count: usize,
}

/// Read-only collection of regions with lookup by identifier
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    regions: Vec<Region>,
    index: HashMap<String, usize>,
}

impl RegionCatalog {
    /// Build a catalog, keeping the first occurrence of a duplicated identifier
    pub fn new(regions: Vec<Region>) -> Self {
        let mut kept = Vec::with_capacity(regions.len());
        let mut index = HashMap::with_capacity(regions.len());
        for region in regions {
            if index.contains_key(&region.id) {
                tracing::warn!(region_id = %region.id, "Duplicate region id in catalog, ignoring");
                continue;
            }
            index.insert(region.id.clone(), kept.len());
            kept.push(region);
        }
        Self {
            regions: kept,
            index,
        }
    }

    /// Built-in Madhya Pradesh district table
    pub fn builtin() -> Self {
        let regions = MP_DISTRICTS
            .iter()
            .map(|&(code, name, hindi, lat, lng)| Region {
                id: format!("{}_{}", MP_STATE_CODE, code),
                name: name.to_string(),
                localized_name: hindi.to_string(),
                state: MP_STATE_NAME.to_string(),
                state_code: MP_STATE_CODE.to_string(),
                district_code: code.to_string(),
                coordinate: Coordinate::new(lat, lng),
            })
            .collect();
        Self::new(regions)
    }

    /// Load a catalog from a JSON array of regions
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read region catalog {}: {}", path.display(), e))
        })?;
        let regions: Vec<Region> = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse region catalog {}: {}", path.display(), e))
        })?;

        for region in &regions {
            if Region::split_id(&region.id).is_none() {
                return Err(Error::Config(format!(
                    "Region id '{}' is not of the form <state>_<district>",
                    region.id
                )));
            }
            region.coordinate.validate()?;
        }

        Ok(Self::new(regions))
    }

    pub fn all(&self) -> &[Region] {
        &self.regions
    }

    pub fn get(&self, id: &str) -> Option<&Region> {
        self.index.get(id).map(|&i| &self.regions[i])
    }

    /// Case-insensitive substring search over id, name and localized name.
    /// An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Region> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.regions.iter().collect();
        }
        self.regions
            .iter()
            .filter(|r| {
                r.id.to_lowercase().contains(&needle)
                    || r.name.to_lowercase().contains(&needle)
                    || r.localized_name.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Distinct states, sorted by name, with their region counts
    pub fn states(&self) -> Vec<StateSummary> {
        let mut states: Vec<StateSummary> = Vec::new();
        for region in &self.regions {
            match states.iter_mut().find(|s| s.state_code == region.state_code) {
                Some(state) => state.region_count += 1,
                None => states.push(StateSummary {
                    state_code: region.state_code.clone(),
                    name: region.state.clone(),
                    region_count: 1,
                }),
            }
        }
        states.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.state_code.cmp(&b.state_code)));
        states
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
