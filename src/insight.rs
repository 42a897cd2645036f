// Insight Narrator - one deterministic sentence per chart
// Extremum sentences name the maximum group; the rest are fixed descriptions

use crate::aggregate::Aggregate;
use crate::table::format_number;

/// "Overall Trend" insight: the year with the highest total.
pub fn overall_trend(agg: &Aggregate) -> String {
    match agg.max_entry() {
        Some((year, total)) => format!(
            "Overall Trend: The highest number of students was in {} with {} students.",
            year,
            format_number(total)
        ),
        None => "Overall Trend: no rows available to summarize.".to_string(),
    }
}

pub fn trend_by_branch() -> String {
    "Trend by Branch: This graph shows how student counts varied across branches over the years."
        .to_string()
}

/// "Students by Branch" insight: the branch with the highest total.
pub fn students_by_branch(agg: &Aggregate) -> String {
    match agg.max_entry() {
        Some((branch, total)) => format!(
            "Students by Branch: The branch with the most students is {} with {} students.",
            branch,
            format_number(total)
        ),
        None => "Students by Branch: no rows available to summarize.".to_string(),
    }
}

/// "Students by Category" insight: the category with the highest total.
pub fn students_by_category(agg: &Aggregate) -> String {
    match agg.max_entry() {
        Some((category, total)) => format!(
            "Students by Category: The category with the most students is {} with {} students.",
            category,
            format_number(total)
        ),
        None => "Students by Category: no rows available to summarize.".to_string(),
    }
}

pub fn students_by_year_and_gender() -> String {
    "Students by Year and Gender: This stacked bar plot shows the distribution of students by gender over the years."
        .to_string()
}

pub fn proportion_by_branch() -> String {
    "Proportion by Branch: This pie chart shows the percentage of students in each branch."
        .to_string()
}

pub fn boxplot_by_branch() -> String {
    "Boxplot by Branch: This boxplot highlights the variation in student counts across branches."
        .to_string()
}

pub fn correlation_heatmap() -> String {
    "Correlation Heatmap: This heatmap shows correlations between numerical variables.".to_string()
}

pub fn violin_by_gender() -> String {
    "Violin Plot by Gender: This violin plot shows the distribution of student counts by gender."
        .to_string()
}

pub fn cumulative_by_year() -> String {
    "Cumulative Students by Year: This area chart shows the cumulative student counts by year."
        .to_string()
}

pub fn treemap_of_branches() -> String {
    "Treemap of Branches: This treemap provides a hierarchical view of student counts by branch."
        .to_string()
}

/// Substitute sentence for the treemap slot when the capability is off.
pub fn treemap_unavailable() -> String {
    "Treemap not generated: treemap rendering is not available in this build.".to_string()
}

// ============================================================================
// TESTS
// ============================================================================
