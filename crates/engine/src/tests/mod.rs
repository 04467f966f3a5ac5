//! Cross-component tests over a small in-memory dataset

mod pipeline_test;

use crate::dataset::{read_behaviors, read_news, Dataset};

pub(crate) const NEWS: &str = "\
N1\tsports\tfootball_nfl\tQuarterback throws record touchdown\tThe season's best passing game.\thttps://example.com/N1\n\
N2\tsports\tbasketball_nba\tPlayoff touchdown of a different kind\tA buzzer beater stuns fans.\thttps://example.com/N2\n\
N3\tnews\tnewspolitics\tElection results certified\tOfficials confirm the vote count.\thttps://example.com/N3\n\
N4\tnews\tnewsus\tStorm damages coastal towns\tResidents begin cleanup.\thttps://example.com/N4\n\
N5\tfinance\tmarkets\tMarkets rally after rate cut\tInvestors cheer the decision.\thttps://example.com/N5\n\
N6\tfinance\tpersonalfinance\tHow to budget for the holidays\tSimple steps to save money.\thttps://example.com/N6\n\
N7\tlifestyle\tlifestyleroyals\tRoyal wedding plans revealed\tThe ceremony will be held in spring.\thttps://example.com/N7\n\
N8\tnews\tnewsworld\tElection turnout hits record\tVoters lined up for hours.\thttps://example.com/N8\n\
N9\tsports\tgolf\tGolf legend announces retirement\tA storied career ends.\thttps://example.com/N9\n\
N10\thealth\twellness\tNew health guidance for winter\tDoctors recommend vaccines.\thttps://example.com/N10\n";

pub(crate) const BEHAVIORS: &str = "\
1\tU1\t11/11/2019 9:05:58 AM\tN1 N2\tN9-1 N3-0\n\
2\tU2\t11/11/2019 10:00:00 AM\tN3 N8\tN4-1 N1-0\n\
3\tU3\t11/12/2019 8:30:00 AM\tN5\tN6-1 N7-0\n\
4\tU1\t11/13/2019 7:15:00 PM\tN9\tN10-0\n\
5\tU4\t11/13/2019 8:00:00 PM\tN3 N4 N404\tN8-1\n";

pub(crate) fn fixture() -> Dataset {
    Dataset::new(
        read_news(NEWS.as_bytes()).unwrap(),
        read_behaviors(BEHAVIORS.as_bytes(), None).unwrap(),
    )
}
