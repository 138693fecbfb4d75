// src/bulk/plan.rs
use tracing::{debug, warn};

use super::schemas::{BulkRow, RowContext};
use crate::csv::CsvRow;
use crate::error::BulkError;

/// Valid payload entries plus one diagnostic per rejected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkPlan<T> {
    pub payload: Vec<T>,
    pub errors: Vec<String>,
}

impl<T> BulkPlan<T> {
    /// A plan with nothing to send is terminal; the row diagnostics travel
    /// with the error.
    pub fn require_rows(self) -> Result<Self, BulkError> {
        if self.payload.is_empty() {
            return Err(BulkError::NoValidRows {
                errors: self.errors,
            });
        }
        Ok(self)
    }
}

/// Maps every decoded row; rejected rows are reported as `Row n: ...` where
/// `n` is the spreadsheet line (the header is line 1).
pub fn plan_rows<T: BulkRow>(rows: &[CsvRow], ctx: &RowContext) -> BulkPlan<T> {
    let mut payload = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        match T::from_row(row, ctx) {
            Ok(entry) => payload.push(entry),
            Err(reason) => {
                let line = idx + 2;
                warn!(row = line, reason, "skipping csv row");
                errors.push(format!("Row {line}: {reason}"));
            }
        }
    }

    debug!(valid = payload.len(), rejected = errors.len(), "planned bulk rows");
    BulkPlan { payload, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bulk::schemas::{NewApiClient, VehicleGroupUpdate};
    use crate::csv::parse_csv_records;

    #[test]
    fn one_bad_row_of_five_is_reported_by_line() {
        let text = "name,role\n\
                    a,admin\n\
                    b,driver\n\
                    c,\n\
                    d,researcher\n\
                    e,insurance_partner\n";
        let rows = parse_csv_records(text).rows;
        let plan: BulkPlan<NewApiClient> = plan_rows(&rows, &RowContext::default());

        assert_eq!(plan.payload.len(), 4);
        assert_eq!(plan.errors, vec!["Row 4: missing name or role"]);
        let names: Vec<_> = plan.payload.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn all_invalid_rows_is_terminal() {
        let rows = parse_csv_records("group_id,name\ng-1,\n,x\n").rows;
        let plan: BulkPlan<VehicleGroupUpdate> = plan_rows(&rows, &RowContext::default());
        match plan.require_rows() {
            Err(BulkError::NoValidRows { errors }) => assert_eq!(
                errors,
                vec!["Row 2: no updates provided", "Row 3: missing group_id"]
            ),
            other => panic!("expected NoValidRows, got {other:?}"),
        }
    }

    #[test]
    fn header_only_file_is_terminal() {
        let rows = parse_csv_records("name,role\n").rows;
        let plan: BulkPlan<NewApiClient> = plan_rows(&rows, &RowContext::default());
        assert!(plan.errors.is_empty());
        assert!(matches!(plan.require_rows(), Err(BulkError::NoValidRows { .. })));
    }
}
