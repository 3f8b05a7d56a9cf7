use std::collections::BTreeSet;

use itertools::Itertools;

/// College value meaning the exchange agreement covers the whole institution.
pub const WHOLE_SCHOOL: &str = "全校";

const WHOLE_SCHOOL_MARKERS: &[&str] = &["全校", "所有學院"];

/// Region bucket for countries matching no table entry.
pub const REGION_OTHER: &str = "其他";

// Canonical college -> department spellings seen in the source data.
// Matching is plain substring containment; order within a list is irrelevant.
const COLLEGE_TABLE: &[(&str, &[&str])] = &[
    ("文學院", &[
        "文學院", "中文系", "外文系", "歷史系", "哲學系", "人類學系", "圖資系",
        "日文系", "戲劇系", "語言學研究所",
    ]),
    ("理學院", &[
        "理學院", "數學系", "物理系", "化學系", "地質系", "心理系", "地理系", "大氣系",
    ]),
    ("社會科學院", &[
        "社會科學院", "政治系", "經濟系", "社會系", "社工系", "新聞所", "國發所",
    ]),
    ("醫學院", &[
        "醫學院", "醫學系", "牙醫系", "藥學系", "護理系", "醫技系", "物治系", "職治系",
    ]),
    ("工學院", &[
        "工學院", "土木系", "機械系", "化工系", "材料系", "工海系", "醫工系", "應力所",
    ]),
    ("生農學院", &[
        "生農學院", "農藝系", "生工系", "農化系", "森林系", "動科系", "農經系",
        "園藝系", "獸醫系", "生傳系", "生機系", "昆蟲系", "植微系",
    ]),
    ("管理學院", &[
        "管理學院", "工管系", "會計系", "財金系", "國企系", "資管系", "MBA", "EMBA", "GMBA",
    ]),
    ("公衛學院", &["公衛學院", "公衛系"]),
    ("電資學院", &[
        "電資學院", "電機系", "資工系", "光電所", "電信所", "電子所", "網媒所",
    ]),
    ("法律學院", &["法律學院", "法律系", "科法所"]),
    ("生科學院", &["生科學院", "生化科技學系", "生命科學系"]),
];

// Region -> country names. First region whose list has a substring match wins.
const REGION_TABLE: &[(&str, &[&str])] = &[
    ("北美洲", &["美國", "加拿大", "墨西哥"]),
    ("歐洲", &[
        "英國", "法國", "德國", "義大利", "西班牙", "荷蘭", "比利時", "瑞士", "奧地利",
        "瑞典", "挪威", "丹麥", "芬蘭", "波蘭", "捷克", "匈牙利", "葡萄牙", "希臘",
        "愛爾蘭", "冰島", "盧森堡", "愛沙尼亞", "拉脫維亞", "立陶宛", "斯洛伐克",
        "斯洛維尼亞", "克羅埃西亞", "羅馬尼亞", "保加利亞", "塞爾維亞", "烏克蘭",
    ]),
    ("亞洲", &[
        "日本", "韓國", "中國", "香港", "新加坡", "泰國", "馬來西亞", "印尼", "菲律賓",
        "越南", "印度", "以色列", "土耳其", "阿聯酋", "沙烏地阿拉伯", "台灣",
    ]),
    ("大洋洲", &["澳洲", "澳大利亞", "紐西蘭", "新西蘭", "斐濟"]),
    ("南美洲", &["巴西", "阿根廷", "智利", "哥倫比亞", "秘魯", "委內瑞拉"]),
    ("非洲", &["南非", "埃及", "肯亞", "奈及利亞", "摩洛哥"]),
];

// Chinese country name -> English, exact match. Used for geocode queries only;
// unmapped names pass through unchanged.
const COUNTRY_EN_TABLE: &[(&str, &str)] = &[
    ("巴西", "Brazil"),
    ("加拿大", "Canada"),
    ("智利", "Chile"),
    ("中國", "China"),
    ("丹麥", "Denmark"),
    ("芬蘭", "Finland"),
    ("法國", "France"),
    ("德國", "Germany"),
    ("香港", "Hong Kong"),
    ("印度", "India"),
    ("印尼", "Indonesia"),
    ("愛爾蘭", "Ireland"),
    ("以色列", "Israel"),
    ("義大利", "Italy"),
    ("日本", "Japan"),
    ("韓國", "South Korea"),
    ("南韓", "South Korea"),
    ("馬來西亞", "Malaysia"),
    ("墨西哥", "Mexico"),
    ("荷蘭", "Netherlands"),
    ("紐西蘭", "New Zealand"),
    ("挪威", "Norway"),
    ("菲律賓", "Philippines"),
    ("波蘭", "Poland"),
    ("葡萄牙", "Portugal"),
    ("俄羅斯", "Russia"),
    ("新加坡", "Singapore"),
    ("南非", "South Africa"),
    ("西班牙", "Spain"),
    ("瑞典", "Sweden"),
    ("瑞士", "Switzerland"),
    ("泰國", "Thailand"),
    ("土耳其", "Turkey"),
    ("英國", "United Kingdom"),
    ("美國", "United States"),
    ("越南", "Vietnam"),
    ("澳門", "Macau"),
    ("蒙古", "Mongolia"),
    ("奧地利", "Austria"),
    ("比利時", "Belgium"),
    ("捷克", "Czech Republic"),
    ("希臘", "Greece"),
    ("匈牙利", "Hungary"),
    ("冰島", "Iceland"),
    ("拉脫維亞", "Latvia"),
    ("立陶宛", "Lithuania"),
    ("盧森堡", "Luxembourg"),
    ("科索沃", "Kosovo"),
    ("斯洛維尼亞", "Slovenia"),
    ("哥倫比亞", "Colombia"),
    ("澳大利亞", "Australia"),
];

/// Normalize a free-text college/department mention into the canonical set,
/// pipe-joined and sorted. A whole-school marker wins over everything else;
/// no match at all yields None.
pub fn standardize_colleges(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }

    if WHOLE_SCHOOL_MARKERS.iter().any(|m| text.contains(m)) {
        return Some(WHOLE_SCHOOL.to_string());
    }

    let matched: BTreeSet<&str> = COLLEGE_TABLE
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(college, _)| *college)
        .collect();

    if matched.is_empty() {
        None
    } else {
        Some(matched.iter().join("|"))
    }
}

/// Map a raw country string onto its continent bucket. Never empty: anything
/// unrecognized lands in the catch-all bucket.
pub fn standardize_region(country: &str) -> &'static str {
    if country.is_empty() {
        return REGION_OTHER;
    }

    REGION_TABLE
        .iter()
        .find(|(_, countries)| countries.iter().any(|c| country.contains(c)))
        .map(|(region, _)| *region)
        .unwrap_or(REGION_OTHER)
}

/// English country name for geocode queries; unmapped names pass through.
pub fn country_to_english(country: &str) -> String {
    COUNTRY_EN_TABLE
        .iter()
        .find(|(zh, _)| *zh == country)
        .map(|(_, en)| (*en).to_string())
        .unwrap_or_else(|| country.to_string())
}

/// True if `region` is a canonical bucket (including the catch-all).
pub fn is_canonical_region(region: &str) -> bool {
    region == REGION_OTHER || REGION_TABLE.iter().any(|(r, _)| *r == region)
}
