use crate::schema::LineType;

/// Section headed by the P&L report structure. `Other` is the pre-header
/// initial state, not a real report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainSection {
    Income,
    CostOfGoodsSold,
    Expense,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubSection {
    Operating,
    Other,
}

/// State carried row-to-row through a single top-to-bottom pass over a
/// "distribution account by month" sheet. Classification is strictly
/// sequential: section headers precede their line items in the source report,
/// so reordering rows changes the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionState {
    pub main: MainSection,
    pub sub: SubSection,
}

impl Default for SectionState {
    fn default() -> Self {
        Self {
            main: MainSection::Other,
            sub: SubSection::Operating,
        }
    }
}

impl SectionState {
    /// Applies one row label. Section-header text transitions the state;
    /// any other text carries the state over unchanged.
    pub fn transition(self, label: &str) -> SectionState {
        match label.trim().to_lowercase().as_str() {
            "income" => SectionState {
                main: MainSection::Income,
                sub: SubSection::Operating,
            },
            "cost of goods sold" => SectionState {
                main: MainSection::CostOfGoodsSold,
                sub: SubSection::Operating,
            },
            "expenses" | "expense" => SectionState {
                main: MainSection::Expense,
                sub: SubSection::Operating,
            },
            "other income" => SectionState {
                main: MainSection::Income,
                sub: SubSection::Other,
            },
            "other expenses" | "other expense" => SectionState {
                main: MainSection::Expense,
                sub: SubSection::Other,
            },
            _ => self,
        }
    }

    /// Composite type for a row visited in this state.
    pub fn line_type(self) -> LineType {
        match (self.main, self.sub) {
            (MainSection::CostOfGoodsSold, _) => LineType::Cogs,
            (MainSection::Income, SubSection::Operating) => LineType::OperatingIncome,
            (MainSection::Income, SubSection::Other) => LineType::OtherIncome,
            (MainSection::Expense, SubSection::Operating) => LineType::OperatingExpense,
            (MainSection::Expense, SubSection::Other) => LineType::OtherExpense,
            // No section header seen yet; a sheet that never leaves this
            // state did not match the expected report structure.
            (MainSection::Other, _) => LineType::Unclassified,
        }
    }
}

/// Stamps every row label with its composite type by folding the section
/// state machine over the ordered sequence. Header rows are stamped with the
/// state they introduce, not the prior one; the reshaper filters them out
/// later.
pub fn classify_rows<I, S>(labels: I) -> Vec<LineType>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .scan(SectionState::default(), |state, label| {
            *state = state.transition(label.as_ref());
            Some(state.line_type())
        })
        .collect()
}
